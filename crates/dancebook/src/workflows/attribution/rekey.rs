use serde::Serialize;
use tracing::info;

use super::domain::SessionId;
use super::store::{AttributionStore, StoreError};

/// Outcome of a renumbering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RekeyReport {
    pub total: usize,
    pub renumbered: usize,
}

impl RekeyReport {
    pub fn untouched(&self) -> bool {
        self.renumbered == 0
    }
}

/// Error raised while renumbering sessions.
#[derive(Debug, thiserror::Error)]
pub enum RekeyError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Renumber all session ids (cascading application references) so they run
/// 1..=N in chronological start order, ties keeping their previous relative
/// order.
///
/// The permutation is computed up front; an identity permutation writes
/// nothing. Old and new id ranges overlap and ids are unique, so every
/// affected session is first staged into a disjoint temporary range
/// (`old + max + 1`) and then moved to its final id. Both passes happen
/// inside one unit of work: any failure drops the transaction and rolls the
/// whole renumbering back.
pub fn rekey_sessions<S>(store: &S) -> Result<RekeyReport, RekeyError>
where
    S: AttributionStore + ?Sized,
{
    let mut txn = store.begin_rekey()?;

    let mut order = txn.session_order();
    order.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let total = order.len();
    let moves: Vec<(SessionId, SessionId)> = order
        .iter()
        .enumerate()
        .map(|(index, (old, _))| (*old, SessionId(index as i64 + 1)))
        .filter(|(old, new)| old != new)
        .collect();

    if moves.is_empty() {
        return Ok(RekeyReport {
            total,
            renumbered: 0,
        });
    }

    let offset = txn.max_session_id().0 + 1;
    for (old, _) in &moves {
        txn.move_session(*old, SessionId(old.0 + offset))?;
    }
    for (old, new) in &moves {
        txn.move_session(SessionId(old.0 + offset), *new)?;
    }

    txn.reset_sequence(SessionId(total as i64));
    txn.commit()?;

    info!(total, renumbered = moves.len(), "sessions renumbered");
    Ok(RekeyReport {
        total,
        renumbered: moves.len(),
    })
}
