use crate::domain::model::{ItemStatus, WorkOrderStatus};

/// Derives a work order's aggregate status from its item statuses.
///
/// `Pending` only while every item is untouched; a mix of finished and
/// unfinished items counts as `InProgress`.
///
/// Returns `None` for an empty list: a work order always has at least one item,
/// so there is no meaningful aggregate to report.
pub fn derive_status<I>(statuses: I) -> Option<WorkOrderStatus>
where
    I: IntoIterator<Item = ItemStatus>,
{
    let mut any = false;
    let mut all_complete = true;
    let mut all_done = true;
    let mut any_ready = false;
    let mut any_started = false;

    for status in statuses {
        any = true;
        match status {
            ItemStatus::Pending => {
                all_complete = false;
                all_done = false;
            }
            ItemStatus::InProgress => {
                all_complete = false;
                all_done = false;
                any_started = true;
            }
            ItemStatus::Ready => {
                all_complete = false;
                any_ready = true;
                any_started = true;
            }
            ItemStatus::Complete => any_started = true,
        }
    }

    if !any {
        return None;
    }

    let status = if all_complete {
        WorkOrderStatus::Complete
    } else if all_done && any_ready {
        WorkOrderStatus::Ready
    } else if any_started {
        // Work has begun on something but not everything is done.
        WorkOrderStatus::InProgress
    } else {
        WorkOrderStatus::Pending
    };
    Some(status)
}
