use sysinfo::System;

/// Resident set size of this process in bytes, if the platform reports it.
pub(super) fn resident_bytes() -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    if !system.refresh_process(pid) {
        return None;
    }
    system.process(pid).map(|process| process.memory())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resident_bytes_is_plausible() {
        // Not every sandbox exposes process info; only check when it does.
        if let Some(bytes) = resident_bytes() {
            assert!(bytes > 0);
        }
    }
}
