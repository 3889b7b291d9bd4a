use ratatui::widgets::{BarChart, Block, Borders, Gauge, List, ListItem, Paragraph, Sparkline};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use crate::stats::{self, WeekTotals};
use crate::tui::app::StatsState;
use crate::tui::widgets::color::Palette;
use crate::utils::{self, format_duration, format_minutes};

pub fn render_stats(f: &mut Frame, area: Rect, stats_state: &StatsState, palette: &Palette) {
    let [today_area, week_area, trend_area] = Layout::vertical([
        Constraint::Length(5),
        Constraint::Min(8),
        Constraint::Length(6),
    ])
    .areas(area);

    render_today(f, today_area, stats_state, palette);

    let [chart_area, distribution_area] =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(week_area);
    render_week(f, chart_area, distribution_area, stats_state, palette);
    render_trend(f, trend_area, stats_state, palette);
}

fn render_today(f: &mut Frame, area: Rect, stats_state: &StatsState, palette: &Palette) {
    let [gauge_area, info_area] =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(area);

    match (&stats_state.today, &stats_state.today_error) {
        (Some(snapshot), _) => {
            let label = format!(
                "{:.1}%  ({} of {:.1}h awake)",
                snapshot.productivity,
                format_duration(snapshot.worked_minutes),
                snapshot.available_hours
            );
            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL).title("Today's productivity"))
                .style(palette.base())
                .gauge_style(palette.accent())
                .ratio((snapshot.productivity / 100.0).clamp(0.0, 1.0))
                .label(label);
            f.render_widget(gauge, gauge_area);
        }
        (None, error) => {
            let text = error.clone().unwrap_or_else(|| "No data yet".to_string());
            let paragraph = Paragraph::new(text)
                .block(Block::default().borders(Borders::ALL).title("Today's productivity"))
                .style(palette.base());
            f.render_widget(paragraph, gauge_area);
        }
    }

    let (wake, sleep) = stats_state
        .preferences
        .as_ref()
        .map(|p| (p.wake_time.as_str(), p.sleep_time.as_str()))
        .unwrap_or(("--:--", "--:--"));
    let worked: f64 = stats::weekly_work_hours(&stats_state.productivity_rows, utils::week_start(utils::today()))
        .iter()
        .map(|(_, hours)| hours)
        .sum();
    let lines = vec![
        format!("Login streak: {} day(s)", stats_state.login_streak),
        format!("Wake {}  Sleep {}", wake, sleep),
        format!("Worked this week: {:.1}h", worked),
    ];
    let paragraph = Paragraph::new(lines.join("\n"))
        .block(Block::default().borders(Borders::ALL).title("You"))
        .style(palette.base());
    f.render_widget(paragraph, info_area);
}

fn render_week(f: &mut Frame, chart_area: Rect, distribution_area: Rect, stats_state: &StatsState, palette: &Palette) {
    let buckets = stats::weekly_overview(&stats_state.week_sessions, utils::week_start(utils::today()));
    let totals = WeekTotals::from_buckets(&buckets);
    let data: Vec<(&str, u64)> = buckets.iter().map(|b| (b.label, b.minutes.round() as u64)).collect();

    let bar_width = (chart_area.width.saturating_sub(2) / 7).saturating_sub(1).clamp(3, 9);
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(format!(
            "Focus this week: {} total, {} a day",
            format_minutes(totals.total),
            format_minutes(totals.daily_average)
        )))
        .data(data.as_slice())
        .bar_width(bar_width)
        .bar_gap(1)
        .bar_style(palette.accent())
        .value_style(palette.highlight())
        .style(palette.base());
    f.render_widget(chart, chart_area);

    let distribution = stats::focus_distribution(&stats_state.week_sessions);
    let items: Vec<ListItem> = if distribution.is_empty() {
        vec![ListItem::new("No focus sessions yet")]
    } else {
        distribution
            .iter()
            .map(|(category, minutes)| {
                let share = if totals.total > 0.0 { minutes / totals.total * 100.0 } else { 0.0 };
                ListItem::new(format!("{:<12} {:>7} {:>4.0}%", category, format_minutes(*minutes), share))
            })
            .collect()
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Where focus went"))
        .style(palette.base());
    f.render_widget(list, distribution_area);
}

fn render_trend(f: &mut Frame, area: Rect, stats_state: &StatsState, palette: &Palette) {
    let points = stats::productivity_overview(&stats_state.productivity_rows, stats_state.period, utils::today());
    let values: Vec<u64> = points.iter().map(|p| p.productivity.round() as u64).collect();
    let average = if points.is_empty() {
        0.0
    } else {
        points.iter().map(|p| p.productivity).sum::<f64>() / points.len() as f64
    };

    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(format!(
            "{} productivity, average {:.1}% (p to switch)",
            stats_state.period.label(),
            average
        )))
        .data(values)
        .max(100)
        .style(palette.accent());
    f.render_widget(sparkline, area);
}
