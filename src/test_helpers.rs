use assert_call::call;

/// Records `drop {label}` when dropped.
///
/// Moved into a task to observe when the runtime releases it.
pub struct DropRecord(&'static str);

impl DropRecord {
    pub fn new(label: &'static str) -> Self {
        Self(label)
    }
}
impl Drop for DropRecord {
    fn drop(&mut self) {
        call!("drop {}", self.0);
    }
}
