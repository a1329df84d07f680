mod task_detail;
mod task_list;

pub use task_detail::TaskDetailView;
pub use task_list::TaskListView;
