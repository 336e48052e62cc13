//! Detail Reporter: expand an allocation's member ids back into rows.

use ps_core::determinism::cmp_f64_desc;
use ps_core::diagnostics::{codes, EntityRef, Issue};
use ps_core::entities::{Attribute, CandidateTable};
use ps_core::ids::{CandidateId, GroupKey};
use tracing::warn;

/// One funded candidate with its delta against the baseline.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailRow {
    pub id: CandidateId,
    pub group_key: GroupKey,
    pub life_value: f64,
    pub delta_life: f64,
    pub cost: f64,
    /// Pass-through columns, filtered by the display selection when given.
    pub attributes: Vec<Attribute>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetailReport {
    /// `delta_life` descending, ties by id ascending.
    pub rows: Vec<DetailRow>,
    pub issues: Vec<Issue>,
}

/// Resolve `member_ids` against `table`.
///
/// Unknown ids are skipped with a warning. If none resolve, the report is
/// empty and carries `Detail.NoMembersResolved`. An empty id list is the
/// legitimate "invest nothing" allocation and produces no diagnostic.
///
/// `display_columns`, when given, selects which pass-through attributes are
/// echoed and in what order; names absent from the table are ignored.
pub fn expand_allocation(
    table: &CandidateTable,
    member_ids: &[CandidateId],
    baseline_life: f64,
    display_columns: Option<&[String]>,
) -> DetailReport {
    let mut report = DetailReport::default();

    for id in member_ids {
        let Some(c) = table.by_id(id) else {
            warn!(candidate = %id, "allocation member not found in candidate table");
            report.issues.push(Issue::warning(
                codes::DETAIL_UNRESOLVED_MEMBER,
                EntityRef::Candidate(id.clone()),
                "member id not present in candidate table",
            ));
            continue;
        };

        let attributes = match display_columns {
            None => c.attributes.clone(),
            Some(cols) => cols
                .iter()
                .filter_map(|name| {
                    c.attribute(name).map(|v| Attribute { name: name.clone(), value: v.to_string() })
                })
                .collect(),
        };

        report.rows.push(DetailRow {
            id: c.id.clone(),
            group_key: c.group_key.clone(),
            life_value: c.life_value,
            delta_life: c.delta(baseline_life),
            cost: c.cost,
            attributes,
        });
    }

    if report.rows.is_empty() && !member_ids.is_empty() {
        warn!(requested = member_ids.len(), "no allocation member could be resolved");
        report.issues.push(Issue::warning(
            codes::DETAIL_NO_MEMBERS_RESOLVED,
            EntityRef::Root,
            format!("none of {} member ids resolved", member_ids.len()),
        ));
    }

    report
        .rows
        .sort_by(|a, b| cmp_f64_desc(a.delta_life, b.delta_life).then_with(|| a.id.cmp(&b.id)));
    report
}
