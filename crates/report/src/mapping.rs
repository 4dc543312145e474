use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::schema::{
    Assumption, Claim, Confidence, Evidence, Gap, GapKind, Question, ReportData, Section,
    SectionRole,
};

/// One field the backend did not supply (or supplied with the wrong type),
/// and the value used in its place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingDefault {
    pub path: String,
    pub substituted: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappedReport {
    pub data: ReportData,
    pub defaults: Vec<MappingDefault>,
}

/// Remap a backend report (final or partial) into the flat view-model.
///
/// Never fails: every missing or malformed field is replaced by a default and
/// listed in [`MappedReport::defaults`]. `{}` maps to an empty report.
pub fn map_report(payload: &Value) -> MappedReport {
    let mut mapper = ReportMapper::default();
    let data = mapper.map(payload);
    MappedReport {
        data,
        defaults: mapper.defaults,
    }
}

#[derive(Default)]
struct ReportMapper {
    defaults: Vec<MappingDefault>,
}

impl ReportMapper {
    fn map(&mut self, payload: &Value) -> ReportData {
        let roles = self.section_roles(payload);
        let sections = self.sections(payload, &roles);

        let claims = {
            let pages: HashMap<&str, u32> = sections
                .iter()
                .map(|s| (s.id.as_str(), s.page))
                .collect();
            self.claims(payload, &pages)
        };

        ReportData { sections, claims }
    }

    fn record(&mut self, path: impl Into<String>, substituted: impl Into<String>) {
        self.defaults.push(MappingDefault {
            path: path.into(),
            substituted: substituted.into(),
        });
    }

    /// Array at `path`, or an empty slice when absent or not an array.
    fn array<'a>(&mut self, payload: &'a Value, path: &[&str]) -> &'a [Value] {
        let mut current = payload;
        for key in path {
            match current.get(key) {
                Some(next) => current = next,
                None => {
                    self.record(path.join("."), "[]");
                    return &[];
                }
            }
        }

        match current.as_array() {
            Some(items) => items,
            None => {
                self.record(path.join("."), "[]");
                &[]
            }
        }
    }

    /// First entry per `claim_id` in the array at `path`.
    fn index_by_claim<'a>(
        &mut self,
        payload: &'a Value,
        path: &[&str],
    ) -> HashMap<String, &'a Value> {
        let mut index = HashMap::new();
        for entry in self.array(payload, path) {
            if let Some(claim_id) = entry.get("claim_id").and_then(as_id) {
                index.entry(claim_id).or_insert(entry);
            }
        }
        index
    }

    fn section_roles(&mut self, payload: &Value) -> HashMap<String, SectionRole> {
        let mut roles = HashMap::new();

        for (idx, entry) in self.array(payload, &["rhetoric", "roles"]).iter().enumerate() {
            let Some(section_id) = entry.get("section_id").and_then(as_id) else {
                continue;
            };

            let raw = entry.get("role").and_then(Value::as_str).unwrap_or("");
            let role = match SectionRole::parse(raw) {
                Some(role) => role,
                None => {
                    self.record(format!("rhetoric.roles[{}].role", idx), "body");
                    SectionRole::Body
                }
            };
            roles.entry(section_id).or_insert(role);
        }

        roles
    }

    fn sections(&mut self, payload: &Value, roles: &HashMap<String, SectionRole>) -> Vec<Section> {
        let items = self.array(payload, &["doc", "sections"]);
        let mut sections = Vec::with_capacity(items.len());

        for (idx, raw) in items.iter().enumerate() {
            let path = format!("doc.sections[{}]", idx);

            let id = match raw.get("section_id").and_then(as_id) {
                Some(id) => id,
                None => {
                    let id = format!("S{}", idx + 1);
                    self.record(format!("{}.section_id", path), id.clone());
                    id
                }
            };

            let title = match non_empty_str(raw.get("title")) {
                Some(title) => title.to_string(),
                None => {
                    let title = format!("Section {}", id);
                    self.record(format!("{}.title", path), title.clone());
                    title
                }
            };

            let page = match raw
                .get("page_range")
                .and_then(|r| r.get(0))
                .and_then(as_page)
            {
                Some(page) => page,
                None => {
                    self.record(format!("{}.page_range", path), "1");
                    1
                }
            };

            let role = match roles.get(&id) {
                Some(role) => *role,
                None => {
                    self.record(format!("{}.type", path), "body");
                    SectionRole::Body
                }
            };

            sections.push(Section {
                id,
                title,
                page,
                role,
            });
        }

        sections
    }

    fn claims(&mut self, payload: &Value, pages: &HashMap<&str, u32>) -> Vec<Claim> {
        let links = self.index_by_claim(payload, &["evidence", "links"]);
        let gap_entries = self.index_by_claim(payload, &["gaps", "analysis"]);
        let validation = self.index_by_claim(payload, &["validation", "report"]);
        let ledger = self.index_by_claim(payload, &["assumptions", "ledger"]);

        let items = self.array(payload, &["claims", "claims"]);
        let mut claims = Vec::with_capacity(items.len());
        let mut taken: HashSet<String> = items
            .iter()
            .filter_map(|raw| raw.get("claim_id").and_then(as_id))
            .collect();

        for (idx, raw) in items.iter().enumerate() {
            let path = format!("claims.claims[{}]", idx);

            // links only follow ids the backend supplied
            let (id, linked) = match raw.get("claim_id").and_then(as_id) {
                Some(id) => (id, true),
                None => {
                    let id = unused_id(&mut taken, idx);
                    self.record(format!("{}.claim_id", path), id.clone());
                    (id, false)
                }
            };

            let statement = match raw.get("statement").and_then(Value::as_str) {
                Some(statement) => statement.to_string(),
                None => {
                    self.record(format!("{}.statement", path), "");
                    String::new()
                }
            };

            let confidence = match raw.get("confidence").and_then(Value::as_f64) {
                Some(score) => Confidence::from_score(score),
                None => {
                    self.record(format!("{}.confidence", path), "low");
                    Confidence::Low
                }
            };

            let key = linked.then_some(id.as_str());

            let evidence = match key.and_then(|k| links.get(k)) {
                Some(link) => self.evidence(&id, link, pages),
                None => Vec::new(),
            };
            let gaps = match key.and_then(|k| gap_entries.get(k)) {
                Some(entry) => self.gaps(&id, entry),
                None => Vec::new(),
            };
            let questions = match key.and_then(|k| validation.get(k)) {
                Some(entry) => self.questions(&id, entry),
                None => Vec::new(),
            };
            let assumptions = match key.and_then(|k| ledger.get(k)) {
                Some(entry) => self.assumptions(&id, entry),
                None => Vec::new(),
            };

            claims.push(Claim {
                id,
                statement,
                confidence,
                evidence,
                gaps,
                questions,
                assumptions,
            });
        }

        claims
    }

    fn evidence(&mut self, claim_id: &str, link: &Value, pages: &HashMap<&str, u32>) -> Vec<Evidence> {
        let path = format!("evidence.links[{}].evidence", claim_id);
        let Some(items) = link.get("evidence").and_then(Value::as_array) else {
            self.record(path, "[]");
            return Vec::new();
        };

        let mut evidence = Vec::with_capacity(items.len());
        for (idx, raw) in items.iter().enumerate() {
            let text = match non_empty_str(raw.get("snippet")) {
                Some(snippet) => snippet.to_string(),
                None => {
                    self.record(format!("{}[{}].snippet", path, idx), "No snippet available");
                    "No snippet available".to_string()
                }
            };

            let section_id = raw.get("section_id").and_then(as_id);
            let source = match &section_id {
                Some(section_id) => format!("Section {}", section_id),
                None => {
                    self.record(format!("{}[{}].section_id", path, idx), "Unknown section");
                    "Unknown section".to_string()
                }
            };

            // 0 means the section is not part of the document outline
            let page = section_id
                .as_deref()
                .and_then(|id| pages.get(id).copied())
                .unwrap_or(0);

            evidence.push(Evidence {
                id: format!("e-{}", idx),
                text,
                source,
                page,
            });
        }

        evidence
    }

    fn gaps(&mut self, claim_id: &str, entry: &Value) -> Vec<Gap> {
        let path = format!("gaps.analysis[{}].signals", claim_id);
        let Some(signals) = entry.get("signals").and_then(Value::as_array) else {
            self.record(path, "[]");
            return Vec::new();
        };

        let mut gaps = Vec::with_capacity(signals.len());
        for (idx, signal) in signals.iter().enumerate() {
            let message = match non_empty_str(signal.get("signal")) {
                Some(message) => message.to_string(),
                None => {
                    self.record(format!("{}[{}].signal", path, idx), "Unspecified gap");
                    "Unspecified gap".to_string()
                }
            };
            gaps.push(Gap {
                kind: GapKind::Weak,
                message,
            });
        }

        gaps
    }

    fn questions(&mut self, claim_id: &str, entry: &Value) -> Vec<Question> {
        let path = format!("validation.report[{}].questions", claim_id);
        let Some(items) = entry.get("questions").and_then(Value::as_array) else {
            self.record(path, "[]");
            return Vec::new();
        };

        let mut questions = Vec::with_capacity(items.len());
        for (idx, raw) in items.iter().enumerate() {
            let text = match raw.get("question").and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => {
                    self.record(format!("{}[{}].question", path, idx), "");
                    String::new()
                }
            };
            questions.push(Question {
                id: format!("q-{}", idx),
                text,
            });
        }

        questions
    }

    fn assumptions(&mut self, claim_id: &str, entry: &Value) -> Vec<Assumption> {
        let path = format!("assumptions.ledger[{}].assumptions", claim_id);
        let Some(items) = entry.get("assumptions").and_then(Value::as_array) else {
            self.record(path, "[]");
            return Vec::new();
        };

        let mut assumptions = Vec::with_capacity(items.len());
        for (idx, raw) in items.iter().enumerate() {
            let Some(statement) = non_empty_str(raw.get("statement")) else {
                self.record(format!("{}[{}]", path, idx), "(skipped)");
                continue;
            };
            let kind = raw
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unspecified")
                .to_string();
            let confidence = raw
                .get("confidence")
                .and_then(Value::as_f64)
                .map(Confidence::from_score)
                .unwrap_or(Confidence::Low);

            assumptions.push(Assumption {
                kind,
                statement: statement.to_string(),
                confidence,
            });
        }

        assumptions
    }
}

/// Ids arrive as strings from the pipeline but as numbers from older dumps.
fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `C{n}` by position, or the first `claim-{n}` no other claim uses.
fn unused_id(taken: &mut HashSet<String>, idx: usize) -> String {
    let mut id = format!("C{}", idx + 1);
    let mut n = idx + 1;
    while taken.contains(&id) {
        id = format!("claim-{}", n);
        n += 1;
    }
    taken.insert(id.clone());
    id
}

fn as_page(value: &Value) -> Option<u32> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|p| *p >= 0.0).map(|p| p as u64))
        .and_then(|p| u32::try_from(p).ok())
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}
