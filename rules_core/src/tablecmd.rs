// rules_core/src/tablecmd.rs
use crate::{RowId, RuleTable, TableError, parse_filter_spec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyStatus {
    Applied,
    Incomplete,         // valid so far, but needs more words
    NotTableCommand,    // doesn't look like table syntax
    BadArgument(String),
    Failed(TableError),
}

fn lex(input: &str) -> Vec<&str> {
    input.split_whitespace().collect()
}

/// Positions typed by the user are 1-based, like the row numbers and
/// "Variant N" headers the views show.
fn position(word: Option<&&str>) -> Result<Option<usize>, ApplyStatus> {
    let Some(word) = word else {
        return Ok(None);
    };
    match word.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(Some(n - 1)),
        _ => Err(ApplyStatus::BadArgument(format!(
            "'{word}' is not a position (1, 2, ...)"
        ))),
    }
}

fn row_id(word: Option<&&str>) -> Result<Option<RowId>, ApplyStatus> {
    let Some(word) = word else {
        return Ok(None);
    };
    word.parse::<u64>()
        .map(Some)
        .map_err(|_| ApplyStatus::BadArgument(format!("'{word}' is not a rule id")))
}

fn done(res: Result<(), TableError>) -> ApplyStatus {
    match res {
        Ok(()) => ApplyStatus::Applied,
        Err(e) => ApplyStatus::Failed(e),
    }
}

// Grammar:
// row add
// row del <id>
// col add
// col del <n>            (n as in "Variant n"; 1 is the primary column)
// drag <from> <to>       (row positions)
// select row|col <n>
// select none
// filter <id> <spec>     (spec: c text | o text | v text)
pub fn try_apply_table_line(line: &str, table: &mut RuleTable) -> ApplyStatus {
    match apply(line, table) {
        Ok(status) | Err(status) => status,
    }
}

fn apply(line: &str, table: &mut RuleTable) -> Result<ApplyStatus, ApplyStatus> {
    let words = lex(line);
    let Some(head) = words.first() else {
        return Ok(ApplyStatus::NotTableCommand);
    };

    let status = match head.to_lowercase().as_str() {
        "row" | "rule" => match words.get(1).map(|w| w.to_lowercase()).as_deref() {
            None => ApplyStatus::Incomplete,
            Some("add") => {
                table.add_row();
                ApplyStatus::Applied
            }
            Some("del" | "delete" | "rm") => match row_id(words.get(2))? {
                None => ApplyStatus::Incomplete,
                Some(id) => done(table.remove_row(id)),
            },
            Some(_) => ApplyStatus::NotTableCommand,
        },

        "col" | "column" | "variant" => match words.get(1).map(|w| w.to_lowercase()).as_deref() {
            None => ApplyStatus::Incomplete,
            Some("add") => {
                table.add_column();
                ApplyStatus::Applied
            }
            Some("del" | "delete" | "rm") => match position(words.get(2))? {
                None => ApplyStatus::Incomplete,
                Some(i) => done(table.remove_column(i)),
            },
            Some(_) => ApplyStatus::NotTableCommand,
        },

        "drag" | "move" => {
            let Some(from) = position(words.get(1))? else {
                return Ok(ApplyStatus::Incomplete);
            };
            let Some(to) = position(words.get(2))? else {
                return Ok(ApplyStatus::Incomplete); // "drag 1" (waiting for target)
            };
            table.begin_drag(from);
            table.mark_drag_target(to);
            if table.end_drag().is_none() && from != to {
                ApplyStatus::BadArgument(format!(
                    "cannot move row {} to {} with {} rules",
                    from + 1,
                    to + 1,
                    table.rules().len()
                ))
            } else {
                ApplyStatus::Applied
            }
        }

        "select" | "sel" => match words.get(1).map(|w| w.to_lowercase()).as_deref() {
            None => ApplyStatus::Incomplete,
            Some("none") => {
                table.clear_selection();
                ApplyStatus::Applied
            }
            Some("row" | "rule") => match position(words.get(2))? {
                None => ApplyStatus::Incomplete,
                Some(i) => {
                    table.select_row(i);
                    ApplyStatus::Applied
                }
            },
            Some("col" | "column" | "variant") => match position(words.get(2))? {
                None => ApplyStatus::Incomplete,
                Some(i) => {
                    table.select_column(i);
                    ApplyStatus::Applied
                }
            },
            Some(_) => ApplyStatus::NotTableCommand,
        },

        "filter" => {
            let Some(id) = row_id(words.get(1))? else {
                return Ok(ApplyStatus::Incomplete);
            };
            if words.len() < 3 {
                return Ok(ApplyStatus::Incomplete);
            }
            // Keep the spec text as typed, spaces included.
            let spec = line
                .trim_start()
                .strip_prefix(*head)
                .map(str::trim_start)
                .and_then(|rest| rest.strip_prefix(words[1]))
                .unwrap_or_default();
            match parse_filter_spec(spec) {
                Ok(tokens) => done(table.set_filter(id, tokens)),
                Err(e) => ApplyStatus::BadArgument(e.to_string()),
            }
        }

        _ => ApplyStatus::NotTableCommand,
    };

    Ok(status)
}
