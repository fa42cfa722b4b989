use super::types::{License, LicenseType};
use std::collections::HashMap;

/// Walks the licenses in order, counting occurrences per holder id.
///
/// Returns `true` on the first license whose terms are already exhausted
/// by the occurrences before it.
pub fn violates_license_terms<'a, I>(licenses: I) -> bool
where
    I: IntoIterator<Item = &'a License>,
{
    let mut occurrences: HashMap<&str, i64> = HashMap::new();

    for license in licenses {
        let seen = occurrences.get(license.i.as_str()).copied().unwrap_or(0);

        match license.t {
            LicenseType::Single => {
                if seen > 0 {
                    tracing::debug!("Single license {} used more than once", license.i);
                    return true;
                }
            }
            LicenseType::Cluster | LicenseType::Multi => {
                if !license.is_unlimited() && seen >= license.mi {
                    tracing::debug!(
                        "License {} exceeds max instances ({} >= {})",
                        license.i,
                        seen,
                        license.mi
                    );
                    return true;
                }
            }
            LicenseType::Other(_) => {}
        }

        *occurrences.entry(license.i.as_str()).or_insert(0) += 1;
    }

    false
}
