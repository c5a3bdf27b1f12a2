use std::sync::OnceLock;
use tera::{Context, Tera};

static TERA: OnceLock<Tera> = OnceLock::new();

const TEMPLATES: &[(&str, &str)] = &[
    ("emails/base.html", include_str!("../templates/emails/base.html")),
    (
        "emails/status_changed.html",
        include_str!("../templates/emails/status_changed.html"),
    ),
    (
        "emails/submission_confirmation.html",
        include_str!("../templates/emails/submission_confirmation.html"),
    ),
    (
        "emails/account_verified.html",
        include_str!("../templates/emails/account_verified.html"),
    ),
    ("landing.html", include_str!("../templates/landing.html")),
];

fn build() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())?;
    Ok(tera)
}

pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| build().expect("embedded templates are valid tera"))
}

pub fn render(name: &str, ctx: &Context) -> Result<String, tera::Error> {
    get_tera().render(name, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_templates_parse() {
        let tera = build().expect("templates parse");
        let names: Vec<_> = tera.get_template_names().collect();
        assert!(names.contains(&"landing.html"));
        assert!(names.contains(&"emails/status_changed.html"));
    }

    #[test]
    fn landing_renders_with_sparse_context() {
        let mut ctx = Context::new();
        ctx.insert("conference_name", "PIT IAGI-GEOSEA 2026");
        ctx.insert(
            "submission",
            &serde_json::json!({ "open": true, "message": "Submission is open" }),
        );
        ctx.insert("contact_address", "Jl. SWK 104\nYogyakarta <55283>");
        let html = render("landing.html", &ctx).expect("landing renders");
        assert!(html.contains("Submission is open"));
        assert!(html.contains("Jl. SWK 104<br>Yogyakarta &lt;55283&gt;"));
    }
}
