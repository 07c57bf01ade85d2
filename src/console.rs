//! Interactive console: runs parsed commands against a backend and renders
//! the results as plain text.

use std::fmt::Write as _;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use crate::crosstab::CrossTabReport;
use crate::dashboard::Dashboard;
use crate::error::ClientError;
use crate::filter::Query;
use crate::frequency::FrequencyTable;
use crate::model::{Field, Record, RecordDraft};
use crate::parser::Command;
use crate::server::{DeleteReply, ErrorBody};
use crate::session::{Session, Theme};
use crate::storage::RecordStore;
use crate::summary::Summary;
use crate::{DeleteOutcome, NatureDb};

/// Where console commands are executed.
pub trait Backend {
    fn query(&self, query: &Query) -> Result<Vec<Record>, ClientError>;
    fn register(&self, draft: &RecordDraft) -> Result<Record, ClientError>;
    fn delete(&self, id: u64) -> Result<DeleteOutcome, ClientError>;
    fn frequencies(&self, field: Field) -> Result<FrequencyTable, ClientError>;
    fn cross_tab(&self, rows: Field, columns: Field) -> Result<CrossTabReport, ClientError>;
    fn summary(&self) -> Result<Summary, ClientError>;
    fn dashboard(&self) -> Result<Dashboard, ClientError>;
}

impl<S: RecordStore> Backend for NatureDb<S> {
    fn query(&self, query: &Query) -> Result<Vec<Record>, ClientError> {
        Ok(NatureDb::query(self, query))
    }

    fn register(&self, draft: &RecordDraft) -> Result<Record, ClientError> {
        Ok(NatureDb::register(self, draft)?)
    }

    fn delete(&self, id: u64) -> Result<DeleteOutcome, ClientError> {
        Ok(NatureDb::delete(self, id)?)
    }

    fn frequencies(&self, field: Field) -> Result<FrequencyTable, ClientError> {
        Ok(NatureDb::frequencies(self, field))
    }

    fn cross_tab(&self, rows: Field, columns: Field) -> Result<CrossTabReport, ClientError> {
        Ok(NatureDb::cross_tab(self, rows, columns))
    }

    fn summary(&self) -> Result<Summary, ClientError> {
        Ok(NatureDb::summary(self))
    }

    fn dashboard(&self) -> Result<Dashboard, ClientError> {
        Ok(NatureDb::dashboard(self))
    }
}

/// Talks to a running `natureseek` server.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    base_url: String,
    client: Client,
}

impl RemoteBackend {
    pub fn new(host: &str) -> Self {
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", host.trim_end_matches('/'))
        };
        Self { base_url, client: Client::new() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        read_json(self.client.get(self.url(path)).send()?)
    }

    /// Liveness probe used at console start-up.
    pub fn ping(&self) -> Result<(), ClientError> {
        self.get::<Summary>("/stats/summary").map(|_| ())
    }
}

fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json()?);
    }
    let message = response
        .json::<ErrorBody>()
        .map(|body| body.error)
        .unwrap_or_else(|_| status.to_string());
    Err(ClientError::Rejected { status: status.as_u16(), message })
}

impl Backend for RemoteBackend {
    fn query(&self, query: &Query) -> Result<Vec<Record>, ClientError> {
        let params: Vec<(&str, &str)> = query
            .predicates()
            .iter()
            .map(|(field, needle)| (field.name(), needle.as_str()))
            .collect();
        read_json(self.client.get(self.url("/records")).query(&params).send()?)
    }

    fn register(&self, draft: &RecordDraft) -> Result<Record, ClientError> {
        read_json(self.client.post(self.url("/records")).json(draft).send()?)
    }

    fn delete(&self, id: u64) -> Result<DeleteOutcome, ClientError> {
        let response = self.client.delete(self.url(&format!("/records/{}", id))).send()?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        read_json::<DeleteReply>(response).map(|reply| reply.outcome)
    }

    fn frequencies(&self, field: Field) -> Result<FrequencyTable, ClientError> {
        self.get(&format!("/stats/frequencies/{}", field))
    }

    fn cross_tab(&self, rows: Field, columns: Field) -> Result<CrossTabReport, ClientError> {
        self.get(&format!("/stats/crosstab/{}/{}", rows, columns))
    }

    fn summary(&self) -> Result<Summary, ClientError> {
        self.get("/stats/summary")
    }

    fn dashboard(&self) -> Result<Dashboard, ClientError> {
        self.get("/stats/dashboard")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Output(String),
    Exit,
}

pub struct Console<B: Backend> {
    backend: B,
    session: Session,
}

impl<B: Backend> Console<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, session: Session::new() }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn execute(&mut self, cmd: Command) -> Result<Outcome, ClientError> {
        let theme = self.session.theme;
        let text = match cmd {
            Command::Help => help_text(),
            Command::Exit => return Ok(Outcome::Exit),

            Command::Register(draft) => {
                let merged = self.session.merge_into(&draft);
                let record = self.backend.register(&merged)?;
                self.session.clear_pending();
                format!("[OK] Registered record #{} ({})", record.id, record.crop)
            }
            Command::Delete { id } => match self.backend.delete(id)? {
                DeleteOutcome::Deleted => format!("[OK] Deleted record #{}", id),
                DeleteOutcome::NotFound => format!("[!] Record #{} not found", id),
            },

            Command::Find { predicates } => {
                let query = predicates.into_iter().fold(Query::new(), |q, (f, n)| q.with(f, n));
                render_records(theme, &self.backend.query(&query)?)
            }
            Command::Freq { field } => render_frequencies(theme, &self.backend.frequencies(field)?),
            Command::Cross { rows, columns } => render_cross_tab(theme, &self.backend.cross_tab(rows, columns)?),
            Command::Summary => render_summary(theme, &self.backend.summary()?),
            Command::Dashboard => render_dashboard(theme, &self.backend.dashboard()?),

            Command::PendingAdd { field, value } => {
                let added = self.session.add_pending(field, &value);
                format!("[OK] Queued {} {} entr{}", added, field, if added == 1 { "y" } else { "ies" })
            }
            Command::PendingClear => {
                self.session.clear_pending();
                "[OK] Pending entries cleared".to_string()
            }
            Command::PendingShow => render_pending(theme, &self.session),
            Command::Theme(next) => {
                self.session.theme = next;
                format!("[OK] Theme set to {:?}", next)
            }
        };
        Ok(Outcome::Output(text))
    }
}

// --- RENDERING ---

fn heading(theme: Theme, text: &str) -> String {
    match theme {
        Theme::Light => format!("{}\n{}", text, "-".repeat(text.chars().count())),
        Theme::Dark => format!("\x1b[1;36m{}\x1b[0m", text),
    }
}

pub fn help_text() -> String {
    [
        "--- Available Commands ---",
        "REGISTER crop=\"Soja\" pests=\"Lagarta, Percevejo\" pesticides=\"...\" area=10.5 cities=\"Sorriso\"",
        "FIND [WHERE field~\"needle\" [AND field~\"needle\" ...]]",
        "FREQ field                 (crop, pests, pesticides, cities)",
        "CROSS field BY field       (e.g. CROSS pests BY pesticides)",
        "SUMMARY | DASHBOARD",
        "DELETE id",
        "PENDING [ADD field \"value\" | CLEAR]",
        "THEME light|dark",
        "EXIT",
    ]
    .join("\n")
}

pub fn render_records(theme: Theme, records: &[Record]) -> String {
    let mut out = heading(theme, &format!("{} record(s)", records.len()));
    for r in records {
        let _ = write!(
            out,
            "\n#{:<4} {:<12} {:>8.2} ha | pests: {} | pesticides: {} | cities: {} | {}",
            r.id,
            r.crop,
            r.area_hectares,
            r.pests,
            r.pesticides,
            r.cities,
            r.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    out
}

pub fn render_frequencies(theme: Theme, table: &FrequencyTable) -> String {
    let mut out = heading(theme, &format!("{} frequency ({} records)", table.field, table.total_records));
    for e in &table.entries {
        let _ = write!(out, "\n{:<24} {:>6} {:>8.2}%", e.token, e.count, e.percentage);
    }
    let _ = write!(
        out,
        "\ndistinct: {} | occurrences: {} | per record: {:.2}",
        table.total_distinct_tokens, table.total_token_occurrences, table.mean_occurrences_per_record,
    );
    out
}

pub fn render_cross_tab(theme: Theme, report: &CrossTabReport) -> String {
    let mut out = heading(theme, &format!("{} per {}", report.column_field, report.row_field));
    if report.rows.is_empty() {
        out.push_str("\n(no pairs)");
    }
    for row in &report.rows {
        let _ = write!(out, "\n{} ({})", row.token, row.total);
        for cell in &row.cells {
            let _ = write!(out, "\n    {:<24} {:>6}", cell.token, cell.count);
        }
    }
    out
}

pub fn render_summary(theme: Theme, s: &Summary) -> String {
    let mut out = heading(theme, "Summary");
    let _ = write!(
        out,
        "\nrecords: {}\nhectares: total {:.2} | mean {:.2} | max {:.2} | min {:.2}\
         \ndistinct crops: {} | pests: {} | pesticides: {} | cities: {}",
        s.total_records,
        s.total_hectares,
        s.mean_hectares,
        s.max_hectares,
        s.min_hectares,
        s.distinct_crops,
        s.distinct_pests,
        s.distinct_pesticides,
        s.distinct_cities,
    );
    out
}

pub fn render_dashboard(theme: Theme, d: &Dashboard) -> String {
    [
        render_summary(theme, &d.summary),
        render_frequencies(theme, &d.crops),
        render_frequencies(theme, &d.pests),
        render_frequencies(theme, &d.pesticides),
        render_frequencies(theme, &d.cities),
        render_cross_tab(theme, &d.pesticides_per_pest),
        render_cross_tab(theme, &d.pests_per_crop),
    ]
    .join("\n\n")
}

fn render_pending(theme: Theme, session: &Session) -> String {
    let mut out = heading(theme, "Pending entries");
    if !session.has_pending() {
        out.push_str("\n(none)");
    }
    for (field, tokens) in session.pending() {
        let _ = write!(out, "\n{}: {}", field, tokens.join(", "));
    }
    out
}
