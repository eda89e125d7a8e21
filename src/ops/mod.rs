mod poll;

pub use poll::{cast_vote, close_poll, create_poll, get_poll, list_open_polls, CreatePollInput};
