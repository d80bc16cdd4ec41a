//! Cluster and application selection.
//!
//! The dashboard cards let the user pick a cluster and then one of its
//! protected applications. This module holds the data side of those
//! dropdowns; all the widgets hand back is a cluster name and an option id.

use crate::models::{ApplicationFilter, ApplicationRef};
use crate::policies::paginator::filter_by_search;

/// Option id of the "All applications" entry.
pub const ALL_APPS_ITEM_ID: &str = "all-applications";

/// Label of the "All applications" entry.
pub const ALL_APPS: &str = "All applications";

/// Separator between namespace and name in an application option id.
const ITEM_ID_SEPARATOR: &str = "%#%";

/// Option id for an application, or the "All applications" id for `None`.
pub fn application_item_id(filter: Option<&ApplicationFilter>) -> String {
    match filter {
        Some(app) => format!("{}{}{}", app.namespace, ITEM_ID_SEPARATOR, app.name),
        None => ALL_APPS_ITEM_ID.to_string(),
    }
}

/// Decode an option id back into an application filter.
///
/// Anything that is not `namespace%#%name` selects all applications.
pub fn parse_application_item_id(item_id: &str) -> Option<ApplicationFilter> {
    let (namespace, name) = item_id.split_once(ITEM_ID_SEPARATOR)?;
    if namespace.is_empty() || name.is_empty() {
        return None;
    }
    Some(ApplicationFilter::new(namespace, name))
}

/// Parse a user supplied application such as `ns/name`, `ns%#%name` or the
/// "All applications" id.
pub fn parse_application_arg(raw: &str) -> Option<ApplicationFilter> {
    let raw = raw.trim();
    if raw.contains(ITEM_ID_SEPARATOR) {
        return parse_application_item_id(raw);
    }
    let (namespace, name) = raw.split_once('/')?;
    let (namespace, name) = (namespace.trim(), name.trim());
    if namespace.is_empty() || name.is_empty() {
        return None;
    }
    Some(ApplicationFilter::new(namespace, name))
}

/// Toggle label for the selected application.
pub fn application_label(filter: Option<&ApplicationFilter>) -> String {
    match filter {
        Some(app) => format!("{} ({})", app.name, app.namespace),
        None => ALL_APPS.to_string(),
    }
}

/// Protected applications grouped by namespace, namespaces in first-seen
/// order and names in input order.
pub fn application_options(protected_apps: &[ApplicationRef]) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();

    for app in protected_apps {
        match groups.iter_mut().find(|(ns, _)| *ns == app.namespace) {
            Some((_, names)) => names.push(app.name.clone()),
            None => groups.push((app.namespace.clone(), vec![app.name.clone()])),
        }
    }

    groups
}

/// Typeahead filter for the cluster dropdown.
pub fn filter_clusters<'a>(clusters: &'a [String], query: &str) -> Vec<&'a String> {
    filter_by_search(clusters, query)
}

/// Cluster to show: the requested one if known, otherwise the first one.
pub fn resolve_cluster<'a>(clusters: &'a [String], requested: Option<&str>) -> Option<&'a String> {
    match requested {
        Some(name) => clusters.iter().find(|cluster| *cluster == name),
        None => clusters.first(),
    }
}
