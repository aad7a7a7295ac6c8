use log::{debug, info, warn};

use crate::drag::{moved_index, splice_move};
use crate::{
    Assignment, DragState, FilterToken, ImageSource, MissingPolicy, RowId, Rule, SelectionMode,
    Settings, TableError, sample_rules,
};

/// The rules table: ordered rules, the shared variant column count, and the
/// transient selection/drag state a view needs.
///
/// Invariant: every rule has exactly `columns` cells.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
    columns: usize,
    next_id: RowId,
    selected_row: Option<usize>,
    selected_column: Option<usize>,
    drag: DragState,
    settings: Settings,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl RuleTable {
    pub fn new(settings: Settings) -> Self {
        let columns = settings.columns();
        let rules = if settings.seed_sample {
            sample_rules()
                .into_iter()
                .map(|mut r| {
                    r.variants.resize(columns, None);
                    r
                })
                .collect()
        } else {
            Vec::new()
        };
        Self::from_rules(rules, columns, settings)
    }

    /// Empty table with the given number of variant columns.
    pub fn empty(columns: usize, settings: Settings) -> Self {
        Self::from_rules(Vec::new(), columns, settings)
    }

    fn from_rules(rules: Vec<Rule>, columns: usize, settings: Settings) -> Self {
        let next_id = rules.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Self {
            rules,
            columns: columns.max(1),
            next_id,
            selected_row: None,
            selected_column: None,
            drag: DragState::Idle,
            settings,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: RowId) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn position(&self, id: RowId) -> Option<usize> {
        self.rules.iter().position(|r| r.id == id)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn selected_row(&self) -> Option<usize> {
        self.selected_row
    }

    pub fn selected_column(&self) -> Option<usize> {
        self.selected_column
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn reject(&self, err: TableError) -> Result<(), TableError> {
        match self.settings.missing {
            MissingPolicy::Ignore => {
                debug!("ignored: {err}");
                Ok(())
            }
            MissingPolicy::Report => {
                warn!("rejected: {err}");
                Err(err)
            }
        }
    }

    pub fn add_row(&mut self) -> RowId {
        let id = self.next_id;
        self.next_id += 1;

        let filter = vec![FilterToken::condition(self.settings.new_row_filter.clone())];
        self.rules.push(Rule::new(id, filter, self.columns));
        debug!("added rule {id} at position {}", self.rules.len() - 1);
        id
    }

    pub fn remove_row(&mut self, id: RowId) -> Result<(), TableError> {
        let Some(pos) = self.position(id) else {
            return self.reject(TableError::NotFound(id));
        };
        self.rules.remove(pos);

        self.selected_row = match self.selected_row {
            Some(sel) if sel == pos => None,
            Some(sel) if sel > pos => Some(sel - 1),
            other => other,
        };
        // A half-finished gesture may point at shifted rows now.
        self.drag = DragState::Idle;

        debug!("removed rule {id} from position {pos}");
        Ok(())
    }

    /// Appends an empty cell to every rule. Returns the new column's index.
    pub fn add_column(&mut self) -> usize {
        for rule in &mut self.rules {
            rule.variants.push(None);
        }
        self.columns += 1;
        debug!("added column, now {}", self.columns);
        self.columns - 1
    }

    pub fn remove_column(&mut self, index: usize) -> Result<(), TableError> {
        if index == 0 || index >= self.columns {
            return self.reject(TableError::InvalidColumn(index));
        }
        for rule in &mut self.rules {
            rule.variants.remove(index);
        }
        self.columns -= 1;
        self.selected_column = None;
        debug!("removed column {index}, now {}", self.columns);
        Ok(())
    }

    pub fn begin_drag(&mut self, source: usize) {
        self.drag.begin(source);
    }

    pub fn mark_drag_target(&mut self, target: usize) {
        self.drag.retarget(target);
    }

    /// Drops the dragged rule at the marked target. The rule is removed
    /// first and inserted at `target` of the shortened list.
    ///
    /// Returns the `(source, target)` pair when rules actually moved.
    pub fn end_drag(&mut self) -> Option<(usize, usize)> {
        let (from, to) = self.drag.finish()?;
        if !splice_move(&mut self.rules, from, to) {
            debug!("drag {from} -> {to} out of range, dropped");
            return None;
        }
        self.selected_row = self.selected_row.map(|sel| moved_index(sel, from, to));
        debug!("moved rule from {from} to {to}");
        Some((from, to))
    }

    pub fn cancel_drag(&mut self) {
        self.drag = DragState::Idle;
    }

    pub fn set_cell_assignment(
        &mut self,
        id: RowId,
        column: usize,
        assignment: Assignment,
    ) -> Result<(), TableError> {
        if column >= self.columns {
            return self.reject(TableError::InvalidColumn(column));
        }
        let Some(pos) = self.position(id) else {
            return self.reject(TableError::NotFound(id));
        };
        debug!("rule {id} column {column} <- '{}'", assignment.title);
        self.rules[pos].variants[column] = Some(assignment);
        Ok(())
    }

    /// Ask `source` for an image and place it into the cell.
    /// `Ok(false)` when nothing was picked.
    pub fn upload_into(
        &mut self,
        id: RowId,
        column: usize,
        source: &mut impl ImageSource,
    ) -> Result<bool, TableError> {
        let Some(picked) = source.pick() else {
            return Ok(false);
        };
        info!(
            "uploading '{}' ({} bytes) into rule {id} column {column}",
            picked.name,
            picked.bytes.len()
        );
        self.set_cell_assignment(id, column, Assignment::from_picked(&picked))?;
        Ok(true)
    }

    pub fn set_filter(&mut self, id: RowId, filter: Vec<FilterToken>) -> Result<(), TableError> {
        let Some(pos) = self.position(id) else {
            return self.reject(TableError::NotFound(id));
        };
        self.rules[pos].filter = filter;
        debug!("rule {id} filter replaced");
        Ok(())
    }

    pub fn select_row(&mut self, index: usize) {
        if index >= self.rules.len() {
            return;
        }
        self.selected_row = next_selection(self.selected_row, index, self.settings.selection);
    }

    pub fn select_column(&mut self, index: usize) {
        if index >= self.columns {
            return;
        }
        self.selected_column = next_selection(self.selected_column, index, self.settings.selection);
    }

    pub fn clear_selection(&mut self) {
        self.selected_row = None;
        self.selected_column = None;
    }
}

fn next_selection(current: Option<usize>, index: usize, mode: SelectionMode) -> Option<usize> {
    match mode {
        SelectionMode::Toggle if current == Some(index) => None,
        _ => Some(index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PickedImage;

    fn settings(missing: MissingPolicy) -> Settings {
        Settings {
            missing,
            seed_sample: false,
            ..Default::default()
        }
    }

    /// Four rules with ids 1..=4 standing for A, B, C, D.
    fn abcd() -> RuleTable {
        let mut t = RuleTable::empty(2, settings(MissingPolicy::Ignore));
        for _ in 0..4 {
            t.add_row();
        }
        t
    }

    fn ids(t: &RuleTable) -> Vec<RowId> {
        t.rules().iter().map(|r| r.id).collect()
    }

    fn art(title: &str) -> Assignment {
        Assignment::new(format!("data:image/png;base64,{title}"), title)
    }

    fn assert_shape(t: &RuleTable) {
        for r in t.rules() {
            assert_eq!(r.variants.len(), t.columns(), "rule {} out of shape", r.id);
        }
    }

    #[test]
    fn seeded_table_has_sample_rules() {
        let t = RuleTable::default();
        assert_eq!(t.rules().len(), 2);
        assert_eq!(t.columns(), 2);
        assert_shape(&t);
    }

    #[test]
    fn seeded_table_follows_initial_columns() {
        let t = RuleTable::new(Settings {
            initial_columns: 4,
            ..Default::default()
        });
        assert_eq!(t.columns(), 4);
        assert_shape(&t);
    }

    #[test]
    fn add_row_uses_default_filter_and_fresh_id() {
        let mut t = RuleTable::default();
        let id = t.add_row();
        assert_eq!(id, 3);

        let r = t.rule(id).unwrap();
        assert_eq!(r.filter, vec![FilterToken::condition("New Filter")]);
        assert_eq!(r.variants, vec![None, None]);
    }

    #[test]
    fn ids_are_not_reused_after_delete() -> anyhow::Result<()> {
        let mut t = abcd();
        t.remove_row(4)?;
        let id = t.add_row();
        assert_eq!(id, 5);
        assert_eq!(ids(&t), vec![1, 2, 3, 5]);
        Ok(())
    }

    #[test]
    fn remove_row_keeps_order_and_is_idempotent() -> anyhow::Result<()> {
        let mut t = abcd();
        t.remove_row(2)?;
        assert_eq!(ids(&t), vec![1, 3, 4]);
        t.remove_row(2)?;
        assert_eq!(ids(&t), vec![1, 3, 4]);
        Ok(())
    }

    #[test]
    fn remove_missing_row_reports_when_asked() {
        let mut t = RuleTable::empty(2, settings(MissingPolicy::Report));
        t.add_row();
        assert_eq!(t.remove_row(9), Err(TableError::NotFound(9)));
        assert_eq!(t.rules().len(), 1);
    }

    #[test]
    fn deleting_selected_row_clears_selection() -> anyhow::Result<()> {
        let mut t = abcd();
        t.select_row(1);
        t.remove_row(2)?;
        assert_eq!(t.selected_row(), None);
        Ok(())
    }

    #[test]
    fn deleting_earlier_row_shifts_selection() -> anyhow::Result<()> {
        let mut t = abcd();
        t.select_row(2); // id 3
        t.remove_row(1)?;
        assert_eq!(t.selected_row(), Some(1));
        assert_eq!(t.rules()[1].id, 3);
        Ok(())
    }

    #[test]
    fn add_column_preserves_cells() -> anyhow::Result<()> {
        let mut t = abcd();
        t.set_cell_assignment(1, 1, art("a"))?;
        let idx = t.add_column();

        assert_eq!(idx, 2);
        assert_eq!(t.columns(), 3);
        assert_shape(&t);
        assert_eq!(t.rule(1).unwrap().variants[1], Some(art("a")));
        assert_eq!(t.rule(1).unwrap().variants[2], None);
        Ok(())
    }

    #[test]
    fn primary_column_cannot_be_removed() -> anyhow::Result<()> {
        let mut t = abcd();
        t.remove_column(0)?;
        assert_eq!(t.columns(), 2);
        assert_shape(&t);

        let mut strict = RuleTable::empty(2, settings(MissingPolicy::Report));
        strict.add_row();
        assert_eq!(strict.remove_column(0), Err(TableError::InvalidColumn(0)));
        assert_eq!(strict.remove_column(2), Err(TableError::InvalidColumn(2)));
        assert_eq!(strict.columns(), 2);
        Ok(())
    }

    #[test]
    fn remove_column_drops_the_cell_in_every_row() -> anyhow::Result<()> {
        let mut t = abcd();
        t.add_column();
        t.set_cell_assignment(3, 1, art("gone"))?;
        t.set_cell_assignment(3, 2, art("kept"))?;
        t.select_column(1);

        t.remove_column(1)?;
        assert_eq!(t.columns(), 2);
        assert_shape(&t);
        assert_eq!(t.rule(3).unwrap().variants, vec![None, Some(art("kept"))]);
        assert_eq!(t.selected_column(), None);
        Ok(())
    }

    #[test]
    fn invalid_remove_keeps_column_selection() -> anyhow::Result<()> {
        let mut t = abcd();
        t.select_column(1);
        t.remove_column(5)?;
        assert_eq!(t.selected_column(), Some(1));
        Ok(())
    }

    #[test]
    fn drag_splices_then_inserts() {
        let mut t = abcd();
        t.begin_drag(0);
        t.mark_drag_target(2);
        assert_eq!(t.end_drag(), Some((0, 2)));
        assert_eq!(ids(&t), vec![2, 3, 1, 4]);
        assert_eq!(t.drag_state(), DragState::Idle);
    }

    #[test]
    fn drag_backwards() {
        let mut t = abcd();
        t.begin_drag(3);
        t.mark_drag_target(0);
        t.end_drag();
        assert_eq!(ids(&t), vec![4, 1, 2, 3]);
    }

    #[test]
    fn drag_without_target_changes_nothing() {
        let mut t = abcd();
        t.begin_drag(1);
        assert_eq!(t.end_drag(), None);
        assert_eq!(ids(&t), vec![1, 2, 3, 4]);
        assert_eq!(t.drag_state(), DragState::Idle);
    }

    #[test]
    fn last_target_wins() {
        let mut t = abcd();
        t.begin_drag(0);
        t.mark_drag_target(1);
        t.mark_drag_target(3);
        t.end_drag();
        assert_eq!(ids(&t), vec![2, 3, 4, 1]);
    }

    #[test]
    fn cancelled_drag_is_idle_without_reorder() {
        let mut t = abcd();
        t.begin_drag(0);
        t.mark_drag_target(3);
        t.cancel_drag();
        assert_eq!(t.end_drag(), None);
        assert_eq!(ids(&t), vec![1, 2, 3, 4]);
    }

    #[test]
    fn out_of_range_drag_is_dropped() {
        let mut t = abcd();
        t.begin_drag(0);
        t.mark_drag_target(7);
        assert_eq!(t.end_drag(), None);
        assert_eq!(ids(&t), vec![1, 2, 3, 4]);
        assert_eq!(t.drag_state(), DragState::Idle);
    }

    #[test]
    fn selection_follows_dragged_rule() {
        let mut t = abcd();
        t.select_row(0);
        t.begin_drag(0);
        t.mark_drag_target(2);
        t.end_drag();
        assert_eq!(t.selected_row(), Some(2));
        assert_eq!(t.rules()[2].id, 1);
    }

    #[test]
    fn assignment_overwrites_cell() -> anyhow::Result<()> {
        let mut t = abcd();
        t.set_cell_assignment(2, 0, art("first"))?;
        t.set_cell_assignment(2, 0, art("second"))?;
        assert_eq!(t.rule(2).unwrap().variants[0], Some(art("second")));
        Ok(())
    }

    #[test]
    fn assignment_out_of_range_changes_nothing() -> anyhow::Result<()> {
        let mut t = abcd();
        let before = t.rules().to_vec();
        t.set_cell_assignment(1, 2, art("x"))?;
        t.set_cell_assignment(42, 0, art("x"))?;
        assert_eq!(t.rules(), before.as_slice());

        let mut strict = RuleTable::empty(2, settings(MissingPolicy::Report));
        let id = strict.add_row();
        assert_eq!(
            strict.set_cell_assignment(id, 2, art("x")),
            Err(TableError::InvalidColumn(2))
        );
        assert_eq!(
            strict.set_cell_assignment(99, 1, art("x")),
            Err(TableError::NotFound(99))
        );
        Ok(())
    }

    #[test]
    fn upload_uses_picked_file() -> anyhow::Result<()> {
        let mut t = abcd();
        let mut source = || Some(PickedImage::new("hero.jpg", vec![1, 2, 3]));
        assert!(t.upload_into(4, 1, &mut source)?);

        let cell = t.rule(4).unwrap().variants[1].clone().unwrap();
        assert_eq!(cell.title, "hero.jpg");
        assert_eq!(cell.payload_bytes()?, vec![1, 2, 3]);

        let mut nothing = || -> Option<PickedImage> { None };
        assert!(!t.upload_into(4, 0, &mut nothing)?);
        assert_eq!(t.rule(4).unwrap().variants[0], None);
        Ok(())
    }

    #[test]
    fn set_filter_replaces_tokens() -> anyhow::Result<()> {
        let mut t = abcd();
        let tokens = vec![FilterToken::condition("tags"), FilterToken::value("x")];
        t.set_filter(3, tokens.clone())?;
        assert_eq!(t.rule(3).unwrap().filter, tokens);
        Ok(())
    }

    #[test]
    fn set_selection_is_idempotent() {
        let mut t = abcd();
        t.select_row(1);
        t.select_row(1);
        assert_eq!(t.selected_row(), Some(1));
        t.select_column(0);
        t.select_column(0);
        assert_eq!(t.selected_column(), Some(0));
    }

    #[test]
    fn toggle_selection_clears_on_reselect() {
        let mut t = RuleTable::new(Settings {
            selection: SelectionMode::Toggle,
            ..Default::default()
        });
        t.select_row(0);
        t.select_row(0);
        assert_eq!(t.selected_row(), None);
        t.select_column(1);
        t.select_column(0);
        assert_eq!(t.selected_column(), Some(0));
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let mut t = abcd();
        t.select_row(9);
        t.select_column(2);
        assert_eq!(t.selected_row(), None);
        assert_eq!(t.selected_column(), None);
    }
}
