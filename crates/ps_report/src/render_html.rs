// crates/ps_report/src/render_html.rs
//
// Deterministic, offline HTML renderer.
// • No external assets; inline CSS only.
// • Static labels in English or Spanish, picked by IETF tag.
// • All content fields HTML-escaped.
// • Money and life values shown with two decimals, ratios and gains with six.
// • Section order: Cover → Optimal → Ranked → Details → Diagnostics → Integrity.

use std::fmt::Write as _;

use crate::{fmt_2dp, fmt_6dp, AllocationSection, DetailLine, ReportModel};

// ------------------------- phrasebook -------------------------

#[derive(Copy, Clone)]
struct Phrase {
    key: &'static str,
    en: &'static str,
    es: &'static str,
}

const PHRASES: &[Phrase] = &[
    Phrase { key: "title",       en: "Project Portfolio Selection", es: "Selección de cartera de proyectos" },
    Phrase { key: "parameters",  en: "Parameters",        es: "Parámetros" },
    Phrase { key: "baseline",    en: "Baseline life",     es: "Vida base" },
    Phrase { key: "budget",      en: "Budget",            es: "Presupuesto" },
    Phrase { key: "scale",       en: "Cost scale",        es: "Escala de costo" },
    Phrase { key: "top_n",       en: "Allocations kept",  es: "Asignaciones" },
    Phrase { key: "max_steps",   en: "Step cap",          es: "Límite de pasos" },
    Phrase { key: "candidates",  en: "Candidates",        es: "Candidatos" },
    Phrase { key: "groups",      en: "Groups",            es: "Grupos" },
    Phrase { key: "optimal",     en: "Optimal allocation", es: "Asignación óptima" },
    Phrase { key: "ranked",      en: "Ranked allocations", es: "Asignaciones ordenadas" },
    Phrase { key: "details",     en: "Allocation details", es: "Detalle de asignaciones" },
    Phrase { key: "rank",        en: "Rank",              es: "Puesto" },
    Phrase { key: "delta",       en: "Life gain",         es: "Ganancia de vida" },
    Phrase { key: "cost",        en: "Cost",              es: "Costo" },
    Phrase { key: "life",        en: "Total life",        es: "Vida total" },
    Phrase { key: "ratio",       en: "Gain per cost",     es: "Ganancia por costo" },
    Phrase { key: "members",     en: "Members",           es: "Proyectos" },
    Phrase { key: "id",          en: "ID",                es: "ID" },
    Phrase { key: "group",       en: "Group",             es: "Grupo" },
    Phrase { key: "life_value",  en: "Life",              es: "Vida" },
    Phrase { key: "delta_life",  en: "Gain",              es: "Ganancia" },
    Phrase { key: "truncated",   en: "Search stopped early after", es: "Búsqueda detenida tras" },
    Phrase { key: "steps",       en: "steps",             es: "pasos" },
    Phrase { key: "diagnostics", en: "Diagnostics",       es: "Diagnósticos" },
    Phrase { key: "none",        en: "None",              es: "Ninguno" },
    Phrase { key: "integrity",   en: "Integrity",         es: "Integridad" },
    Phrase { key: "empty",       en: "(no projects)",     es: "(sin proyectos)" },
];

fn t(lang: &str, key: &str) -> &'static str {
    let spanish = lang == "es" || lang.starts_with("es-") || lang.starts_with("es_");
    for p in PHRASES {
        if p.key == key {
            return if spanish { p.es } else { p.en };
        }
    }
    ""
}

// ------------------------- formatting helpers -------------------------

/// Escape text for HTML (minimal, deterministic).
fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn members_label(lang: &str, ids: &[String]) -> String {
    if ids.is_empty() {
        t(lang, "empty").to_string()
    } else {
        ids.join(", ")
    }
}

// ------------------------- HTML builder -------------------------

pub struct HtmlBuilder<'a> {
    lang: &'a str,
    buf: String,
}

impl<'a> HtmlBuilder<'a> {
    pub fn new(lang: &'a str) -> Self {
        Self { lang, buf: String::with_capacity(32 * 1024) }
    }

    /// Start document with minimal head. Deterministic, asset-free.
    pub fn start(&mut self, title: &str) {
        let _ = write!(
            self.buf,
            "<!doctype html><html lang=\"{}\"><head><meta charset=\"utf-8\">\
             <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\
             <title>{}</title>\
             <style>\
             body{{font-family:system-ui,-apple-system,Segoe UI,Roboto,Ubuntu,Arial,sans-serif;margin:24px;}}\
             h1,h2,h3{{margin:0.2em 0;}}\
             .kv ul{{list-style:none;padding-left:0}}\
             .kv li{{margin:2px 0}}\
             .muted{{opacity:0.8}}\
             .note{{font-style:italic;opacity:0.9}}\
             table{{border-collapse:collapse;margin:8px 0}}\
             td,th{{padding:4px 8px;border-bottom:1px solid #ddd;text-align:left}}\
             td.num{{text-align:right;font-variant-numeric:tabular-nums}}\
             </style></head><body>",
            esc(self.lang),
            esc(title)
        );
    }

    /// Close document.
    pub fn finish(mut self) -> String {
        self.buf.push_str("</body></html>\n");
        self.buf
    }

    pub fn section_cover(&mut self, model: &ReportModel) {
        let c = &model.cover;
        let _ = write!(self.buf, "<h1>{}</h1>", esc(t(self.lang, "title")));
        let _ = write!(self.buf, "<h3>{}</h3><div class=\"kv\"><ul>", esc(t(self.lang, "parameters")));
        let mut items: Vec<(&str, String)> = vec![
            ("baseline", fmt_2dp(c.baseline_life)),
            ("budget", fmt_2dp(c.budget)),
            ("scale", c.scale.to_string()),
            ("top_n", c.top_n.to_string()),
        ];
        if let Some(ms) = c.max_steps {
            items.push(("max_steps", ms.to_string()));
        }
        items.push(("candidates", c.candidates.to_string()));
        items.push(("groups", c.groups.to_string()));
        for (k, v) in items {
            let _ = write!(self.buf, "<li><b>{}</b>: {}</li>", esc(t(self.lang, k)), esc(&v));
        }
        self.buf.push_str("</ul></div>");
    }

    pub fn section_optimal(&mut self, a: &AllocationSection) {
        let _ = write!(self.buf, "<h2>{}</h2><div class=\"kv\"><ul>", esc(t(self.lang, "optimal")));
        for (k, v) in [
            ("delta", fmt_2dp(a.delta_total)),
            ("cost", fmt_2dp(a.cost_total)),
            ("life", fmt_2dp(a.life_total)),
            ("ratio", fmt_6dp(a.ratio)),
            ("members", members_label(self.lang, &a.member_ids)),
        ] {
            let _ = write!(self.buf, "<li><b>{}</b>: {}</li>", esc(t(self.lang, k)), esc(&v));
        }
        self.buf.push_str("</ul></div>");
        self.detail_table(&a.details, &[]);
    }

    pub fn section_ranked(&mut self, model: &ReportModel) {
        let _ = write!(self.buf, "<h2>{}</h2>", esc(t(self.lang, "ranked")));
        if model.search.truncated {
            let _ = write!(
                self.buf,
                "<p class=\"note\">{} {} {}</p>",
                esc(t(self.lang, "truncated")),
                model.search.steps,
                esc(t(self.lang, "steps"))
            );
        }
        self.buf.push_str("<table><thead><tr>");
        for k in ["rank", "delta", "cost", "life", "ratio", "members"] {
            let _ = write!(self.buf, "<th>{}</th>", esc(t(self.lang, k)));
        }
        self.buf.push_str("</tr></thead><tbody>");
        for r in &model.ranked {
            let a = &r.allocation;
            let _ = write!(
                self.buf,
                "<tr><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td>\
                 <td class=\"num\">{}</td><td class=\"num\">{}</td><td>{}</td></tr>",
                r.rank,
                fmt_2dp(a.delta_total),
                fmt_2dp(a.cost_total),
                fmt_2dp(a.life_total),
                fmt_6dp(a.ratio),
                esc(&members_label(self.lang, &a.member_ids)),
            );
        }
        self.buf.push_str("</tbody></table>");
    }

    pub fn section_details(&mut self, model: &ReportModel, attribute_columns: &[String]) {
        let _ = write!(self.buf, "<h2>{}</h2>", esc(t(self.lang, "details")));
        for r in &model.ranked {
            let _ = write!(self.buf, "<h3>{} {}</h3>", esc(t(self.lang, "rank")), r.rank);
            if r.allocation.details.is_empty() {
                let _ = write!(self.buf, "<p class=\"muted\">{}</p>", esc(t(self.lang, "empty")));
                continue;
            }
            self.detail_table(&r.allocation.details, attribute_columns);
        }
    }

    pub fn section_diagnostics(&mut self, model: &ReportModel) {
        let _ = write!(self.buf, "<h2>{}</h2>", esc(t(self.lang, "diagnostics")));
        if model.diagnostics.is_empty() {
            let _ = write!(self.buf, "<p class=\"muted\">{}</p>", esc(t(self.lang, "none")));
            return;
        }
        self.buf.push_str("<ul>");
        for d in &model.diagnostics {
            let _ = write!(
                self.buf,
                "<li><b>{}</b> <code>{}</code> {}: {}</li>",
                esc(&d.severity),
                esc(&d.code),
                esc(&d.where_),
                esc(&d.message)
            );
        }
        self.buf.push_str("</ul>");
    }

    pub fn section_integrity(&mut self, model: &ReportModel) {
        let i = &model.integrity;
        let engine = format!("{} {} {} ({})", i.engine_vendor, i.engine_name, i.engine_version, i.engine_build);
        let _ = write!(self.buf, "<h2>{}</h2><div class=\"kv muted\"><ul>", esc(t(self.lang, "integrity")));
        for (k, v) in [
            ("result_id", i.result_id.as_str()),
            ("run_id", i.run_id.as_str()),
            ("timestamp_utc", i.timestamp_utc.as_str()),
            ("engine", engine.as_str()),
            ("input_sha256", i.input_sha256.as_str()),
            ("params_sha256", i.params_sha256.as_str()),
            ("result_sha256", i.result_sha256.as_str()),
        ] {
            let _ = write!(self.buf, "<li><b>{}</b>: <code>{}</code></li>", esc(k), esc(v));
        }
        self.buf.push_str("</ul></div>");
    }

    fn detail_table(&mut self, rows: &[DetailLine], attribute_columns: &[String]) {
        if rows.is_empty() {
            return;
        }
        self.buf.push_str("<table><thead><tr>");
        for k in ["id", "group", "life_value", "delta_life", "cost"] {
            let _ = write!(self.buf, "<th>{}</th>", esc(t(self.lang, k)));
        }
        for c in attribute_columns {
            let _ = write!(self.buf, "<th>{}</th>", esc(c));
        }
        self.buf.push_str("</tr></thead><tbody>");
        for d in rows {
            let _ = write!(
                self.buf,
                "<tr><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td>",
                esc(&d.id),
                esc(&d.group_key),
                fmt_2dp(d.life_value),
                fmt_6dp(d.delta_life),
                fmt_2dp(d.cost),
            );
            for c in attribute_columns {
                let v = d.attributes.iter().find(|(k, _)| k == c).map(|(_, v)| v.as_str()).unwrap_or("");
                let _ = write!(self.buf, "<td>{}</td>", esc(v));
            }
            self.buf.push_str("</tr>");
        }
        self.buf.push_str("</tbody></table>");
    }
}

// ------------------------- top-level entry -------------------------

/// Render the whole report as one self-contained HTML page.
pub fn render_html(model: &ReportModel, lang: &str) -> String {
    let attribute_columns = model.attribute_columns();
    let mut h = HtmlBuilder::new(lang);
    h.start(t(lang, "title"));
    h.section_cover(model);
    h.section_optimal(&model.optimal);
    h.section_ranked(model);
    h.section_details(model, &attribute_columns);
    h.section_diagnostics(model);
    h.section_integrity(model);
    h.finish()
}
