//! Process selection by name.

use pm2ctl_common::{is_wildcard, Process};

/// Processes selected by `name`, in inventory order.
///
/// `*` selects the whole inventory. Any other name selects every process
/// with exactly that name; pm2 names are not unique. No match is a valid,
/// empty result.
pub fn match_processes<'a>(inventory: &'a [Process], name: &str) -> Vec<&'a Process> {
    if is_wildcard(name) {
        return inventory.iter().collect();
    }
    inventory.iter().filter(|p| p.name == name).collect()
}
