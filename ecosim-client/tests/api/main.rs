mod helpers;
mod history;
mod sampling;
mod submission;
