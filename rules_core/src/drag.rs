/// Progress of a row drag gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        source: usize,
    },
    Targeting {
        source: usize,
        target: usize,
    },
}

impl DragState {
    pub fn is_active(&self) -> bool {
        !matches!(self, DragState::Idle)
    }

    pub fn source(&self) -> Option<usize> {
        match *self {
            DragState::Idle => None,
            DragState::Dragging { source } | DragState::Targeting { source, .. } => Some(source),
        }
    }

    pub fn target(&self) -> Option<usize> {
        match *self {
            DragState::Targeting { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Starts a gesture, dropping whatever a previous one left behind.
    pub fn begin(&mut self, source: usize) {
        *self = DragState::Dragging { source };
    }

    /// Points the gesture at a row. Ignored when nothing is being dragged.
    pub fn retarget(&mut self, target: usize) {
        if let Some(source) = self.source() {
            *self = DragState::Targeting { source, target };
        }
    }

    /// Ends the gesture. Returns the move to perform, if any, and always
    /// leaves the state `Idle`.
    pub fn finish(&mut self) -> Option<(usize, usize)> {
        let out = match *self {
            DragState::Targeting { source, target } if source != target => Some((source, target)),
            _ => None,
        };
        *self = DragState::Idle;
        out
    }
}

/// Remove the item at `from`, then insert it at `to` of the shortened vec.
/// Returns false (and leaves `items` alone) when either index is out of range.
pub fn splice_move<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}

/// Where the index `i` ends up after `splice_move(_, from, to)`.
pub fn moved_index(i: usize, from: usize, to: usize) -> usize {
    if i == from {
        to
    } else if from < i && i <= to {
        i - 1
    } else if to <= i && i < from {
        i + 1
    } else {
        i
    }
}
