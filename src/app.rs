use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::calculator::{self, CalculationEntry};
use crate::config::Config;
use crate::error::{AppError, CalcError};
use crate::projects::{ProjectAction, ProjectList};
use crate::saving::{FlatFileStore, ProjectStore};
use crate::session::{
    History, MemorySessionStore, SESSION_COOKIE, SESSION_DURATION, SessionStore, new_session_id,
};
use crate::stocks::{self, AlphaVantage, QuoteSource};
use crate::views::{CalculatorPage, ProjectsPage, StocksPage, Views};

/// Shared state handed to every handler
pub struct AppState {
    views: Views,
    projects: Arc<dyn ProjectStore>,
    /// Serialises read-modify-write cycles on the project store
    project_guard: Mutex<()>,
    sessions: Arc<dyn SessionStore>,
    quotes: Arc<dyn QuoteSource>,
    demo_key: bool,
}

impl AppState {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        sessions: Arc<dyn SessionStore>,
        quotes: Arc<dyn QuoteSource>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            views: Views::new()?,
            projects,
            project_guard: Mutex::new(()),
            sessions,
            quotes,
            demo_key: false,
        })
    }

    /// Wire up the file store, in-memory sessions and the HTTP quote client
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let mut state = Self::new(
            Arc::new(FlatFileStore::new(&config.projects_file)),
            Arc::new(MemorySessionStore::default()),
            Arc::new(AlphaVantage::new(config)?),
        )?;
        state.demo_key = config.uses_demo_key();
        Ok(state)
    }
}

/// Raw form body as submitted, in field order
pub type FormBody = Result<Form<Vec<(String, String)>>, FormRejection>;

/// Submitted form fields; a repeated field keeps its first value
#[derive(Debug, Default)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    /// Accept whatever the body held; an unreadable body counts as empty
    pub fn from_body(body: FormBody) -> Self {
        match body {
            Ok(Form(pairs)) => Self(pairs),
            Err(rejection) => {
                log::warn!("ignoring unreadable form body: {}", rejection);
                Self::default()
            }
        }
    }

    pub fn first(&self, name: &str) -> Option<String> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }
}

#[derive(Debug, Default)]
pub struct CalculatorForm {
    pub num1: Option<String>,
    pub num2: Option<String>,
    pub operator: Option<String>,
    pub clear: Option<String>,
}

impl From<FormFields> for CalculatorForm {
    fn from(fields: FormFields) -> Self {
        Self {
            num1: fields.first("num1"),
            num2: fields.first("num2"),
            operator: fields.first("operator"),
            clear: fields.first("clear"),
        }
    }
}

#[derive(Debug, Default)]
pub struct ProjectsForm {
    pub add_project: Option<String>,
    pub project_name: Option<String>,
    pub delete_index: Option<String>,
    pub update_project: Option<String>,
    pub update_index: Option<String>,
    pub updated_name: Option<String>,
}

impl ProjectsForm {
    /// Which action the form asks for; add wins over delete, delete over update
    pub fn action(self) -> Option<ProjectAction> {
        if self.add_project.is_some() {
            Some(ProjectAction::Add {
                name: self.project_name.unwrap_or_default(),
            })
        } else if let Some(index) = self.delete_index {
            Some(ProjectAction::Delete { index })
        } else if self.update_project.is_some() {
            Some(ProjectAction::Update {
                index: self.update_index.unwrap_or_default(),
                name: self.updated_name.unwrap_or_default(),
            })
        } else {
            None
        }
    }
}

impl From<FormFields> for ProjectsForm {
    fn from(fields: FormFields) -> Self {
        Self {
            add_project: fields.first("add_project"),
            project_name: fields.first("project_name"),
            delete_index: fields.first("delete_index"),
            update_project: fields.first("update_project"),
            update_index: fields.first("update_index"),
            updated_name: fields.first("updated_name"),
        }
    }
}

#[derive(Debug, Default)]
pub struct StocksForm {
    pub ticker: Option<String>,
}

impl From<FormFields> for StocksForm {
    fn from(fields: FormFields) -> Self {
        Self {
            ticker: fields.first("ticker"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        log::error!("request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

/// Build the router for the three pages plus static assets
pub fn build_router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(calculator_page).post(calculator_submit))
        .route("/projects", get(projects_page).post(projects_submit))
        .route("/stocks", get(stocks_page).post(stocks_submit))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until the process is stopped
pub async fn run(config: Config) -> Result<(), AppError> {
    let state = Arc::new(AppState::from_config(&config)?);
    if state.demo_key {
        log::warn!("ALPHA_VANTAGE_API_KEY is not set; using the demo key");
    }

    let app = build_router(state, &config.static_dir);

    let listener = TcpListener::bind(config.bind_addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Reuse the client's session id or issue a new one
///
/// The cookie is sent back on every response so its lifetime slides along
/// with the server-side expiry.
fn session_for(jar: CookieJar) -> (CookieJar, String) {
    let id = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(new_session_id);

    let cookie = Cookie::build((SESSION_COOKIE, id.clone()))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(SESSION_DURATION.as_secs() as i64))
        .build();
    (jar.add(cookie), id)
}

/// Run the calculation, turning a panic into a reported error
fn evaluate(form: &CalculatorForm) -> Result<CalculationEntry, CalcError> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        calculator::calculate(
            form.num1.as_deref(),
            form.num2.as_deref(),
            form.operator.as_deref(),
        )
    }))
    .unwrap_or_else(|cause| {
        let detail = cause
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| cause.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "calculation failed".to_string());
        Err(CalcError::Unexpected(detail))
    })
}

async fn calculator_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let (jar, session_id) = session_for(jar);
    let history = History::open(state.sessions.as_ref(), &session_id);

    let page = CalculatorPage {
        history: history.entries(),
        ..CalculatorPage::default()
    };
    let html = state.views.calculator(&page)?;
    Ok((jar, Html(html)).into_response())
}

#[axum::debug_handler]
async fn calculator_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: FormBody,
) -> Result<Response, AppError> {
    let form = CalculatorForm::from(FormFields::from_body(body));
    let (jar, session_id) = session_for(jar);
    let history = History::open(state.sessions.as_ref(), &session_id);

    if form.clear.is_some() {
        history.clear();
        log::info!("cleared calculation history");
        return Ok((jar, Redirect::to("/")).into_response());
    }

    let mut page = CalculatorPage::default();
    match evaluate(&form) {
        Ok(entry) => {
            page.result = Some(entry.result.clone());
            history.push(entry);
        }
        Err(e) => page.error = Some(e.to_string()),
    }
    page.history = history.entries();

    let html = state.views.calculator(&page)?;
    Ok((jar, Html(html)).into_response())
}

async fn projects_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let projects = {
        let _guard = state.project_guard.lock().await;
        state.projects.read()
    };

    let html = state.views.projects(&ProjectsPage::new(projects))?;
    Ok(Html(html))
}

async fn projects_submit(
    State(state): State<Arc<AppState>>,
    body: FormBody,
) -> Result<Html<String>, AppError> {
    let form = ProjectsForm::from(FormFields::from_body(body));
    let (projects, outcome) = {
        let _guard = state.project_guard.lock().await;
        let mut list = ProjectList::load(state.projects.as_ref());
        let outcome = form.action().map(|action| list.apply(&action));
        (list.into_projects(), outcome)
    };

    let mut page = ProjectsPage::new(projects);
    match outcome {
        Some(Ok(message)) => page.message = Some(message),
        Some(Err(e)) => page.error = Some(e.to_string()),
        None => {}
    }

    let html = state.views.projects(&page)?;
    Ok(Html(html))
}

async fn stocks_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let page = StocksPage {
        demo_key: state.demo_key,
        ..StocksPage::default()
    };
    Ok(Html(state.views.stocks(&page)?))
}

async fn stocks_submit(
    State(state): State<Arc<AppState>>,
    body: FormBody,
) -> Result<Html<String>, AppError> {
    let form = StocksForm::from(FormFields::from_body(body));
    let raw = form.ticker.unwrap_or_default();
    let mut page = StocksPage {
        ticker: raw.trim().to_uppercase(),
        demo_key: state.demo_key,
        ..StocksPage::default()
    };

    match stocks::lookup(state.quotes.as_ref(), &raw).await {
        Ok(quote) => page.quote = Some(quote),
        Err(e) => page.error = Some(e.to_string()),
    }

    Ok(Html(state.views.stocks(&page)?))
}
