use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use vescwire_schema::{FieldSpec, Message, Value};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One labelled line of human-readable output.
pub type Row = (String, String);

/// Print `record` as JSON, or `rows` as a two-column table / plain lines.
pub fn print_record<T: Serialize>(record: &T, rows: &[Row], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in rows {
                table.add_row(vec![name.clone(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
            for (name, value) in rows {
                println!("{name:<width$}  {value}");
            }
        }
    }
}

/// Rows for every field of a decoded message, in wire order.
pub fn message_rows(message: &Message) -> Vec<Row> {
    message
        .fields()
        .map(|(spec, value)| (spec.name.to_string(), format_value(spec, value)))
        .collect()
}

fn format_value(spec: &FieldSpec, value: Option<&Value>) -> String {
    match (value, spec.scale) {
        (None, _) => "-".to_string(),
        // Show as many decimals as the fixed-point scale carries.
        (Some(Value::Float(v)), Some(scale)) => {
            let digits = scale.checked_ilog10().unwrap_or(0) as usize;
            format!("{v:.digits$}")
        }
        (Some(value), _) => value.to_string(),
    }
}

pub fn print_message(message: &Message, format: OutputFormat) {
    print_record(message, &message_rows(message), format);
}
