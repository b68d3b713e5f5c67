use axum::{http::StatusCode, response::Html};
use serde::Serialize;
use tera::{Context, Tera};

use crate::common::{RouteErrorResponse, RouteResult};

macro_rules! template {
    ($name:literal) => {
        ($name, include_str!(concat!("../templates/", $name)))
    };
}

/// The html templates, compiled into the binary.
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn load() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            template!("base.html"),
            template!("index.html"),
            template!("cards.html"),
            template!("detail.html"),
            template!("login.html"),
            template!("admin.html"),
            template!("confirm_delete.html"),
            template!("not_found.html"),
        ])?;
        Ok(Self { tera })
    }

    pub fn render<V: Serialize>(&self, name: &str, view: &V) -> RouteResult<Html<String>> {
        Context::from_serialize(view)
            .and_then(|context| self.tera.render(name, &context))
            .map(Html)
            .map_err(|why| {
                log::error!("could not render {}: {:?}", name, why);
                RouteErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR)
                    .with_default_message()
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn all_templates_compile() {
        let templates = Templates::load().unwrap();
        let page = templates
            .render("not_found.html", &json!({ "path": "/nulle-part" }))
            .unwrap();
        assert!(page.0.contains("&#x2F;nulle-part"));
    }

    #[test]
    fn values_are_escaped() {
        let templates = Templates::load().unwrap();
        let page = templates
            .render("not_found.html", &json!({ "path": "<script>" }))
            .unwrap();
        assert!(!page.0.contains("<script>"));
    }
}
