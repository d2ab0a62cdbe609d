/// Escape a value for use inside a single-quoted WIQL literal.
pub fn escape_single_quoted(value: &str) -> String {
    value.replace('\'', "''")
}

/// Build a project-scoped WIQL query matching any term in title or description.
///
/// Returns `None` when there are no non-blank terms, since an empty
/// `CONTAINS` clause is rejected by the service.
pub fn text_search_query(project: &str, terms: &[String]) -> Option<String> {
    let clauses = terms
        .iter()
        .map(|term| term.trim())
        .filter(|term| !term.is_empty())
        .map(|term| {
            let term = escape_single_quoted(term);
            format!("[System.Title] CONTAINS '{term}' OR [System.Description] CONTAINS '{term}'")
        })
        .collect::<Vec<_>>();

    if clauses.is_empty() {
        return None;
    }

    Some(format!(
        "SELECT [System.Id], [System.Title], [System.Description], \
         [System.WorkItemType], [System.State], [System.CreatedDate] \
         FROM WorkItems \
         WHERE [System.TeamProject] = '{}' AND ({}) \
         ORDER BY [System.ChangedDate] DESC",
        escape_single_quoted(project),
        clauses.join(" OR ")
    ))
}
