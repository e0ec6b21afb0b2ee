use crate::calibration::Report;
use crate::calibration::ReportTable;
use crate::calibration::CATEGORY_FIELD;
use quick_xml::escape::escape;
use std::fmt::Write;

const EMPTY_SECTION: &str = "<p>No aplica.</p>";

/// Renders a projected report as the HTML mail body.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn render(&self, report: &Report) -> String {
        let mut html = String::new();
        html.push_str("<h2>🔔 Alerta de calibraciones</h2>\n");
        // writing into a String cannot fail
        let _ = writeln!(
            html,
            "<p>Instrumentos vencidos y próximos a vencer en {} días.</p>",
            report.threshold_days
        );
        html.push_str("\n<h3>🔴 Vencidos</h3>\n");
        html.push_str(&self.render_table(&report.overdue));
        html.push_str("\n\n<h3>🟠 Próximos a vencer</h3>\n");
        html.push_str(&self.render_table(&report.upcoming));
        html.push('\n');
        html
    }

    /// One bordered table, with the category as last column.
    pub fn render_table(&self, table: &ReportTable) -> String {
        if table.is_empty() {
            return EMPTY_SECTION.to_owned();
        }

        let mut html = String::from("<table border=\"1\">\n<thead>\n<tr>");
        for field in table.fields.iter().map(String::as_str).chain([CATEGORY_FIELD]) {
            let _ = write!(html, "<th>{}</th>", escape(display_case(field).as_str()));
        }
        html.push_str("</tr>\n</thead>\n<tbody>\n");
        for row in &table.rows {
            html.push_str("<tr>");
            for cell in &row.cells {
                let _ = write!(html, "<td>{}</td>", escape(cell.to_string().as_str()));
            }
            let _ = write!(html, "<td>{}</td>", row.category);
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>");
        html
    }
}

/// Title-cases a column name and turns underscores into spaces:
/// `FECHA_PROXIMA` becomes `Fecha Proxima`.
pub fn display_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut in_word = false;
    for character in name.chars() {
        if character.is_alphabetic() {
            if in_word {
                result.extend(character.to_lowercase());
            } else {
                result.extend(character.to_uppercase());
            }
            in_word = true;
        } else {
            result.push(if character == '_' { ' ' } else { character });
            in_word = false;
        }
    }
    result
}
