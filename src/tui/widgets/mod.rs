pub mod color;
pub mod community_view;
pub mod confirm_delete;
pub mod diary_view;
pub mod editor;
pub mod form;
pub mod help;
pub mod leaderboard_view;
pub mod pomodoro_view;
pub mod stats_view;
pub mod status_bar;
pub mod tabs;
pub mod task_list;
