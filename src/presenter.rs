use crate::config::AllowList;
use crate::filter::{expand, restrict_to_user, user_options};
use crate::models::{ChartView, DashboardView, UserFilter};
use crate::normalize::normalize;
use crate::state::Session;
use crate::stats::{billable_bars, summarize, tag_distribution, user_distribution};

pub const NO_DATA_NOTICE: &str = "No time tracking data available for the selected period.";
pub const NO_TAGGED_DATA_NOTICE: &str =
    "No time entries for the selected period carry a tracked client tag.";

/// Runs normalize, filter and aggregate over the cached entries and decides
/// which table and charts the page shows.
pub fn build_view(
    session: &Session,
    allow_list: &AllowList,
    requested: &UserFilter,
) -> DashboardView {
    let mut view = DashboardView {
        start_date: session.range.start_label(),
        end_date: session.range.end_label(),
        selected_user: requested.label().to_string(),
        user_options: Vec::new(),
        fetched_at: Some(session.fetched_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        error: session.fetch_error.clone(),
        notice: None,
        summary: Vec::new(),
        charts: Vec::new(),
    };

    if session.entries.is_empty() {
        view.notice = Some(NO_DATA_NOTICE.to_string());
        return view;
    }

    let in_scope = expand(&normalize(&session.entries), allow_list);
    if in_scope.is_empty() {
        view.notice = Some(NO_TAGGED_DATA_NOTICE.to_string());
        return view;
    }

    view.user_options = user_options(&in_scope);
    let filter = match requested {
        UserFilter::User(name) if !view.user_options.contains(name) => UserFilter::All,
        other => other.clone(),
    };
    view.selected_user = filter.label().to_string();

    let user_rows = restrict_to_user(&in_scope, &filter);
    view.summary = summarize(&user_rows);

    match &filter {
        UserFilter::User(name) => view.charts.push(ChartView::Pie {
            title: format!("Time Breakdown for {name}"),
            slices: tag_distribution(&user_rows),
        }),
        UserFilter::All => {
            view.charts.push(ChartView::Pie {
                title: "Time Distribution Across All Users".to_string(),
                slices: tag_distribution(&in_scope),
            });
            view.charts.push(ChartView::Pie {
                title: "Total Hours Logged Per User".to_string(),
                slices: user_distribution(&in_scope),
            });
        }
    }
    view.charts.push(ChartView::StackedBar {
        title: format!(
            "Hours Logged per Activity (Billable vs Non-Billable) - {}",
            filter.label()
        ),
        segments: billable_bars(&user_rows),
    });

    view
}
