//! Dialogue engine: the per-turn state machine
//!
//! A turn runs in two phases:
//!
//! 1. **Slot phase.** Canteen, then date entities are resolved and written
//!    into the session. A canteen change or an effective date change drops
//!    the cached menu. An unresolvable canteen ends the turn right here.
//! 2. **Rule phase.** The first rule in [`RULES`] whose guard accepts the
//!    turn decides the action.
//!
//! A cached menu that no longer matches the session's canteen and
//! effective date (a new day has begun) is dropped before either phase.
//!
//! The engine works on an owned copy of the session and returns it whole;
//! callers persist it only after the turn has finished.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use super::{entity, Intent, Response, TurnInput};
use crate::canteen::CanteenRegistry;
use crate::date::DateResolver;
use crate::error::FetchError;
use crate::fetcher::{MenuFetcher, DEFAULT_FETCH_TIMEOUT};
use crate::menu::{Menu, MenuQuery};
use crate::parser::MenuParser;
use crate::session::{DialogueState, Session, SessionId, SessionStore};

/// Result of one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The session to persist
    pub session: Session,

    /// Directives in emission order
    pub responses: Vec<Response>,
}

impl TurnOutcome {
    pub fn state(&self) -> DialogueState {
        self.session.state()
    }

    /// Last directive of the turn
    pub fn last(&self) -> Option<&Response> {
        self.responses.last()
    }

    pub fn rendered(&self) -> Vec<String> {
        self.responses.iter().map(ToString::to_string).collect()
    }
}

/// What the slot phase observed
#[derive(Debug, Clone)]
struct TurnContext {
    intent: Intent,
    category: Option<String>,
    date_given: bool,
    canteen_resolved: bool,
    canteen_changed: bool,
    date_changed: bool,
    /// Session was awaiting a canteen before this turn
    awaited_canteen: bool,
    /// Categories had been listed or shown before this turn
    flow_was_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Reset,
    Greet,
    Goodbye,
    ShowMenu,
    AcknowledgeCanteen,
    SelectCategory,
    DeferCategory,
    AcknowledgeDate,
    Fallback,
}

struct Rule {
    name: &'static str,
    guard: fn(&TurnContext, &Session) -> bool,
    action: Action,
}

/// Ordered transition table; first match wins
const RULES: &[Rule] = &[
    Rule {
        name: "reset",
        guard: |ctx, _| ctx.intent == Intent::Reset,
        action: Action::Reset,
    },
    Rule {
        name: "greet",
        guard: |ctx, _| ctx.intent == Intent::Greet,
        action: Action::Greet,
    },
    Rule {
        name: "goodbye",
        guard: |ctx, _| ctx.intent == Intent::Goodbye,
        action: Action::Goodbye,
    },
    Rule {
        name: "menu-request",
        guard: |ctx, _| ctx.intent == Intent::AskMenu,
        action: Action::ShowMenu,
    },
    Rule {
        name: "canteen-given",
        guard: |ctx, _| {
            ctx.canteen_resolved
                && (ctx.canteen_changed
                    || ctx.awaited_canteen
                    || !ctx.flow_was_active
                    || ctx.category.is_none())
        },
        action: Action::AcknowledgeCanteen,
    },
    Rule {
        name: "date-changed-mid-flow",
        guard: |ctx, _| ctx.date_changed && ctx.flow_was_active && ctx.intent != Intent::SetDate,
        action: Action::ShowMenu,
    },
    Rule {
        name: "category-selection",
        guard: |ctx, session| {
            (ctx.category.is_some() || ctx.intent == Intent::SelectCategory)
                && session.cached_menu().is_some()
        },
        action: Action::SelectCategory,
    },
    Rule {
        name: "category-before-menu",
        guard: |ctx, _| ctx.category.is_some() || ctx.intent == Intent::SelectCategory,
        action: Action::DeferCategory,
    },
    Rule {
        name: "date-given",
        guard: |ctx, _| ctx.date_given || ctx.intent == Intent::SetDate,
        action: Action::AcknowledgeDate,
    },
    Rule {
        name: "inform-while-awaiting-canteen",
        guard: |ctx, _| ctx.intent == Intent::Inform && ctx.awaited_canteen,
        action: Action::ShowMenu,
    },
    Rule {
        name: "fallback",
        guard: |_, _| true,
        action: Action::Fallback,
    },
];

fn select_rule(ctx: &TurnContext, session: &Session) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.guard)(ctx, session))
        .unwrap_or(&RULES[RULES.len() - 1])
}

/// Mutable state of a turn in progress
struct Turn {
    session: Session,
    responses: Vec<Response>,
    today: NaiveDate,
}

impl Turn {
    fn respond(&mut self, response: Response) {
        self.responses.push(response);
    }

    fn finish(self) -> TurnOutcome {
        TurnOutcome {
            session: self.session,
            responses: self.responses,
        }
    }
}

/// Orchestrates resolvers, fetcher, parser and session slots
#[derive(Debug, Clone)]
pub struct DialogueEngine {
    canteens: CanteenRegistry,
    dates: DateResolver,
    parser: MenuParser,
    fetcher: Arc<dyn MenuFetcher>,
    fetch_timeout: Duration,
}

impl DialogueEngine {
    pub fn new(fetcher: Arc<dyn MenuFetcher>) -> Self {
        Self {
            canteens: CanteenRegistry::default(),
            dates: DateResolver::new(),
            parser: MenuParser::new(),
            fetcher,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_canteens(mut self, canteens: CanteenRegistry) -> Self {
        self.canteens = canteens;
        self
    }

    /// Upper bound for a single provider call
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn canteens(&self) -> &CanteenRegistry {
        &self.canteens
    }

    /// Run one turn against a session held in `store`.
    ///
    /// The session stays locked for the whole turn and is written back only
    /// once the turn is complete; dropping this future earlier leaves the
    /// stored session untouched.
    pub async fn process_turn(
        &self,
        store: &SessionStore,
        id: &SessionId,
        input: &TurnInput,
        today: NaiveDate,
    ) -> TurnOutcome {
        let mut lease = store.checkout(id).await;
        let outcome = self.handle_turn(lease.get(), input, today).await;
        lease.put(outcome.session.clone());
        outcome
    }

    /// Run one turn on `session`, with `today` as the reference date
    pub async fn handle_turn(&self, mut session: Session, input: &TurnInput, today: NaiveDate) -> TurnOutcome {
        if session.drop_stale_cache(today) {
            tracing::debug!("Cached menu is no longer current on {}, dropped", today);
        }

        let intent = input.intent();
        let mut ctx = TurnContext {
            category: entity(&input.entities.category).map(str::to_string),
            date_given: entity(&input.entities.date).is_some(),
            canteen_resolved: false,
            canteen_changed: false,
            date_changed: false,
            awaited_canteen: session.is_awaiting_canteen(),
            flow_was_active: session.in_category_flow(),
            intent,
        };
        let mut turn = Turn {
            session,
            responses: Vec::new(),
            today,
        };

        if ctx.intent.applies_slots() && !self.apply_slots(&mut turn, &mut ctx, input) {
            return turn.finish();
        }

        let rule = select_rule(&ctx, &turn.session);
        tracing::debug!("Turn intent={} rule={}", ctx.intent, rule.name);
        self.execute(rule.action, &mut turn, &ctx).await;

        turn.finish()
    }

    /// Slot phase. Returns false when the turn must stop.
    fn apply_slots(&self, turn: &mut Turn, ctx: &mut TurnContext, input: &TurnInput) -> bool {
        if let Some(text) = entity(&input.entities.canteen) {
            match self.canteens.resolve(Some(text)) {
                Some(canteen) => {
                    ctx.canteen_resolved = true;
                    ctx.canteen_changed = turn.session.set_canteen(canteen.id.clone());
                    if ctx.canteen_changed {
                        tracing::debug!("Canteen set to {}", canteen.id);
                    }
                }
                None => {
                    tracing::debug!("Unknown canteen {:?}", text);
                    if turn.session.canteen().is_none() {
                        turn.session.await_canteen();
                    }
                    turn.respond(Response::InvalidCanteen {
                        input: text.to_string(),
                        options: self.canteens.display_names(),
                    });
                    return false;
                }
            }
        }

        if let Some(text) = entity(&input.entities.date) {
            let date = self.dates.resolve_or_today(Some(text), turn.today);
            ctx.date_changed = turn.session.set_date(date, turn.today);
        }

        true
    }

    async fn execute(&self, action: Action, turn: &mut Turn, ctx: &TurnContext) {
        match action {
            Action::Reset => {
                turn.session.reset();
                turn.respond(Response::SessionReset);
            }
            Action::Greet => turn.respond(Response::Greeting),
            Action::Goodbye => turn.respond(Response::Goodbye),
            Action::ShowMenu => self.show_menu(turn, ctx.category.as_deref()).await,
            Action::AcknowledgeCanteen => {
                if let Some(id) = turn.session.canteen() {
                    let canteen = self.canteens.display_name(id);
                    turn.respond(Response::GotItCheckingCanteen { canteen });
                }
                self.show_menu(turn, ctx.category.as_deref()).await;
            }
            Action::SelectCategory => match ctx.category.as_deref() {
                Some(name) => self.select_category(turn, name),
                None => self.list_categories(turn),
            },
            Action::DeferCategory => self.show_menu(turn, ctx.category.as_deref()).await,
            Action::AcknowledgeDate => {
                if ctx.date_given {
                    let date = turn.session.effective_date(turn.today);
                    turn.respond(Response::DateSet { date });
                } else {
                    turn.respond(Response::AskForDate);
                }
            }
            Action::Fallback => turn.respond(Response::Fallback),
        }
    }

    /// Menu display: cache hit, or fetch and parse on a miss
    async fn show_menu(&self, turn: &mut Turn, category: Option<&str>) {
        if let Some(name) = category {
            turn.session.set_pending_category(name);
        }

        let Some(query) = turn.session.query(turn.today) else {
            turn.session.await_canteen();
            turn.respond(Response::AskForCanteen {
                options: self.canteens.display_names(),
            });
            return;
        };

        if turn.session.cached_menu_for(&query).is_some() {
            tracing::debug!("Menu cache hit for {}", query);
            turn.session.await_category();
        } else {
            match self.load_menu(&query).await {
                Ok(menu) if menu.is_empty() => {
                    turn.session.end_flow();
                    turn.session.take_pending_category();
                    turn.respond(Response::NoMenuAvailable {
                        canteen: self.canteens.display_name(&query.canteen),
                        date: query.date,
                    });
                    return;
                }
                Ok(menu) => turn.session.cache_menu(menu),
                Err(response) => {
                    turn.session.stop_awaiting_canteen();
                    turn.respond(response);
                    return;
                }
            }
        }

        match turn.session.take_pending_category() {
            Some(name) => self.select_category(turn, &name),
            None => self.list_categories(turn),
        }
    }

    /// Fetch and parse; failures come back as the directive to emit
    async fn load_menu(&self, query: &MenuQuery) -> Result<Menu, Response> {
        let canteen = self.canteens.display_name(&query.canteen);

        let raw = self.fetch(query).await.map_err(|e| {
            tracing::warn!("Menu fetch failed for {}: {}", query, e);
            Response::FetchError {
                canteen: canteen.clone(),
                date: query.date,
                kind: e.kind,
                detail: e.detail,
            }
        })?;

        let menu = self.parser.parse(query, &raw).map_err(|e| {
            tracing::warn!("Menu parse failed for {}: {}", query, e);
            Response::ParseError {
                canteen: canteen.clone(),
                date: query.date,
                reason: e.reason,
            }
        })?;

        tracing::info!(
            "Loaded menu {} ({} categories, {} items)",
            query,
            menu.category_names().len(),
            menu.item_count()
        );
        Ok(menu)
    }

    async fn fetch(&self, query: &MenuQuery) -> Result<String, FetchError> {
        match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(query)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::timeout(format!(
                "Request timed out for canteen {} on {}",
                query.canteen,
                query.date_param()
            ))),
        }
    }

    fn list_categories(&self, turn: &mut Turn) {
        let Some(menu) = turn.session.cached_menu() else {
            return;
        };
        let response = Response::CategoriesListing {
            canteen: self.canteens.display_name(&menu.query.canteen),
            date: menu.query.date,
            categories: turn.session.available_categories().to_vec(),
        };
        turn.session.await_category();
        turn.respond(response);
    }

    /// Exact, case-insensitive category match against the cached menu
    fn select_category(&self, turn: &mut Turn, name: &str) {
        let Some(menu) = turn.session.cached_menu() else {
            return;
        };

        match menu.find_category(name) {
            Some(category) => {
                let response = Response::CategoryItems {
                    canteen: self.canteens.display_name(&menu.query.canteen),
                    date: menu.query.date,
                    category: category.name.clone(),
                    items: category.items.clone(),
                    available: turn.session.available_categories().to_vec(),
                };
                let shown = category.name.clone();
                turn.session.show_category(shown);
                turn.respond(response);
            }
            None => {
                let response = Response::InvalidCategory {
                    input: name.to_string(),
                    available: turn.session.available_categories().to_vec(),
                };
                turn.respond(response);
            }
        }
    }
}
