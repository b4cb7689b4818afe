/// Completion rule for a session: every snapshot item has a recorded
/// attempt. The flag this feeds is monotonic — the scorer refuses
/// completed sessions outright, so the transition can never be walked
/// back by a later evaluation.
pub fn completion_due(distinct_attempted: usize, snapshot_len: usize) -> bool {
    snapshot_len > 0 && distinct_attempted >= snapshot_len
}
