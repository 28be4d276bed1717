use tracing::debug;

use crate::system::platform::ProcessSource;

/// Owning account of `pid`, or `None` if the token could not be read and no
/// identity string could be produced.
pub fn resolve<S: ProcessSource + ?Sized>(source: &S, pid: u32) -> Option<String> {
    let owner = source.owner(pid).filter(|owner| !owner.is_empty());
    if owner.is_none() {
        debug!(pid, "owner unavailable");
    }
    owner
}

/// `DOMAIN\name`, or just `name` for accounts without a domain.
pub fn qualified_account(domain: &str, name: &str) -> Option<String> {
    match (domain.is_empty(), name.is_empty()) {
        (_, true) => None,
        (true, false) => Some(name.to_string()),
        (false, false) => Some(format!("{domain}\\{name}")),
    }
}
