//! Unit and behavioural tests for the call monitor core.

mod dispatch;
