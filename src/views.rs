use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

use crate::calculator::CalculationEntry;
use crate::projects::{MAX_NAME_LEN, MAX_PROJECTS};
use crate::stocks::StockQuote;

/// Data behind the calculator page
#[derive(Debug, Default, Serialize)]
pub struct CalculatorPage {
    pub result: Option<String>,
    pub error: Option<String>,
    pub history: Vec<CalculationEntry>,
}

#[derive(Debug, Serialize)]
pub struct ProjectRow {
    pub index: usize,
    pub name: String,
}

/// Data behind the projects page
#[derive(Debug, Default, Serialize)]
pub struct ProjectsPage {
    pub projects: Vec<ProjectRow>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ProjectsPage {
    pub fn new(projects: Vec<String>) -> Self {
        Self {
            projects: projects
                .into_iter()
                .enumerate()
                .map(|(index, name)| ProjectRow { index, name })
                .collect(),
            ..Self::default()
        }
    }
}

/// Data behind the stocks page
#[derive(Debug, Default, Serialize)]
pub struct StocksPage {
    pub ticker: String,
    pub quote: Option<StockQuote>,
    pub error: Option<String>,
    pub demo_key: bool,
}

/// Compiled page templates
pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    /// Compile the embedded templates
    ///
    /// # Errors
    /// * `TemplateError` if a template fails to parse
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_partial("layout", include_str!("./templates/layout.hbs"))?;
        registry.register_template_string("calculator", include_str!("./templates/calculator.hbs"))?;
        registry.register_template_string("projects", include_str!("./templates/projects.hbs"))?;
        registry.register_template_string("stocks", include_str!("./templates/stocks.hbs"))?;
        Ok(Self { registry })
    }

    pub fn calculator(&self, page: &CalculatorPage) -> Result<String, RenderError> {
        self.render("calculator", "Calculator", page)
    }

    pub fn projects(&self, page: &ProjectsPage) -> Result<String, RenderError> {
        #[derive(Serialize)]
        struct Limits<'a> {
            #[serde(flatten)]
            page: &'a ProjectsPage,
            can_add: bool,
            max_projects: usize,
            max_name_len: usize,
        }

        let data = Limits {
            page,
            can_add: page.projects.len() < MAX_PROJECTS,
            max_projects: MAX_PROJECTS,
            max_name_len: MAX_NAME_LEN,
        };
        self.render("projects", "Projects", &data)
    }

    pub fn stocks(&self, page: &StocksPage) -> Result<String, RenderError> {
        self.render("stocks", "Stock Lookup", page)
    }

    fn render<T: Serialize>(
        &self,
        template: &str,
        title: &str,
        data: &T,
    ) -> Result<String, RenderError> {
        #[derive(Serialize)]
        struct Frame<'a, T> {
            page: &'a str,
            title: &'a str,
            #[serde(flatten)]
            data: &'a T,
        }

        self.registry.render(
            template,
            &Frame {
                page: template,
                title,
                data,
            },
        )
    }
}
