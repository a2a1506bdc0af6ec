mod common;
mod ranking;
mod trace;
