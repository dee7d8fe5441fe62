use crate::config::AllowList;
use crate::models::{ALL_USERS, ExpandedRow, NormalizedEntry, UserFilter};

/// One row per (entry, tag) pair whose tag is on the allow-list.
pub fn expand(entries: &[NormalizedEntry], allow_list: &AllowList) -> Vec<ExpandedRow> {
    entries
        .iter()
        .flat_map(move |entry| {
            entry
                .tag_names
                .iter()
                .filter(move |tag| allow_list.contains(tag))
                .map(move |tag| ExpandedRow {
                    start_date: entry.start_date,
                    end_date: entry.end_date,
                    task_id: entry.task_id.clone(),
                    user_name: entry.user_name.clone(),
                    tag_name: tag.to_lowercase(),
                    duration_hours: entry.duration_hours,
                    billable: entry.billable,
                })
        })
        .collect()
}

pub fn restrict_to_user(rows: &[ExpandedRow], filter: &UserFilter) -> Vec<ExpandedRow> {
    match filter {
        UserFilter::All => rows.to_vec(),
        UserFilter::User(name) => rows
            .iter()
            .filter(|row| row.user_name.as_deref() == Some(name.as_str()))
            .cloned()
            .collect(),
    }
}

/// `All Users` followed by each distinct user name in first-seen order.
pub fn user_options(rows: &[ExpandedRow]) -> Vec<String> {
    let mut options = vec![ALL_USERS.to_string()];
    for name in rows.iter().filter_map(|row| row.user_name.as_deref()) {
        if !options.iter().any(|seen| seen == name) {
            options.push(name.to_string());
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Billable;

    fn entry(user: &str, tags: &[&str], hours: f64) -> NormalizedEntry {
        NormalizedEntry {
            start_date: None,
            end_date: None,
            task_id: None,
            user_name: Some(user.to_string()),
            tag_names: tags.iter().map(|tag| tag.to_lowercase()).collect(),
            duration_hours: Some(hours),
            billable: Billable::Billable,
        }
    }

    #[test]
    fn out_of_scope_tags_are_dropped() {
        let rows = expand(&[entry("alice", &["KAMOA", "Foo"], 1.0)], &AllowList::builtin());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tag_name, "kamoa");
    }

    #[test]
    fn each_in_scope_tag_gets_its_own_row() {
        let allow = AllowList::builtin();
        let rows = expand(&[entry("bob", &["kamoa", "pmc", "internal"], 2.0)], &allow);
        let tags: Vec<&str> = rows.iter().map(|row| row.tag_name.as_str()).collect();
        assert_eq!(tags, vec!["kamoa", "pmc"]);
        assert!(rows.iter().all(|row| allow.contains(&row.tag_name)));

        assert!(expand(&[entry("bob", &[], 2.0)], &allow).is_empty());
    }

    #[test]
    fn user_restriction_keeps_exact_matches() {
        let rows = expand(
            &[
                entry("alice", &["kamoa"], 1.0),
                entry("Alice", &["pmc"], 1.0),
                entry("bob", &["ivm"], 1.0),
            ],
            &AllowList::builtin(),
        );

        let alice = restrict_to_user(&rows, &UserFilter::User("alice".to_string()));
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].tag_name, "kamoa");

        assert_eq!(restrict_to_user(&rows, &UserFilter::All), rows);
    }

    #[test]
    fn user_options_list_sentinel_then_first_seen_users() {
        let mut anonymous = entry("x", &["ivm"], 1.0);
        anonymous.user_name = None;
        let rows = expand(
            &[
                entry("bob", &["kamoa"], 1.0),
                anonymous,
                entry("alice", &["pmc"], 1.0),
                entry("bob", &["pmc"], 1.0),
            ],
            &AllowList::builtin(),
        );
        assert_eq!(user_options(&rows), vec![ALL_USERS, "bob", "alice"]);
    }
}
