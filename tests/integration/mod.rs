//! Integration tests driving the agent-ship binary against fake tools

#[cfg(unix)]
mod helpers;

#[cfg(unix)]
mod test_commands;
#[cfg(unix)]
mod test_distribute;
#[cfg(unix)]
mod test_doctor;
#[cfg(unix)]
mod test_run;
