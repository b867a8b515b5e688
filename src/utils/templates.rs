use minijinja::{context, Environment};

use crate::error::AppError;

const INDEX: &str = "index.html";
const REFLECTION: &str = "reflection.html";

/// Page templates compiled into the binary. Names ending in `.html` are auto-escaped.
#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn load() -> Result<Self, AppError> {
        let mut env = Environment::new();
        env.add_template(INDEX, include_str!("../../static/index.html"))?;
        env.add_template(REFLECTION, include_str!("../../static/reflection.html"))?;
        Ok(Templates { env })
    }

    pub fn index(&self, latest_question: &str, progress_value: &str) -> Result<String, AppError> {
        let page = self.env.get_template(INDEX)?.render(context! {
            latest_question => latest_question,
            progress_value => progress_value,
        })?;
        Ok(page)
    }

    pub fn reflection(&self, responses: &[String]) -> Result<String, AppError> {
        let page = self
            .env
            .get_template(REFLECTION)?
            .render(context! { responses => responses })?;
        Ok(page)
    }
}
