//! Launch environment helpers.
//!
//! The process-group size is supplied by whoever launches the program, not by
//! a command-line flag. These functions read the variables that launchers
//! export and return `None` when a variable is unset or unparsable.
//!
//! # Environment Variables
//!
//! | Variable | Set by |
//! |----------|--------|
//! | `RINGSHIFT_NP` | the user, explicitly |
//! | `OMPI_COMM_WORLD_SIZE` | Open MPI's `mpiexec` |
//! | `PMI_SIZE` | MPICH / Hydra |
//! | `SLURM_NTASKS` | SLURM `srun` |
//!
//! The first one set wins, in the order above.

use std::env;

/// Variable that sets the group size explicitly.
pub const NP_VAR: &str = "RINGSHIFT_NP";

/// Group size used when no launcher variable is present.
pub const DEFAULT_GROUP_SIZE: i32 = 4;

const LAUNCHER_VARS: [&str; 4] = [NP_VAR, "OMPI_COMM_WORLD_SIZE", "PMI_SIZE", "SLURM_NTASKS"];

fn parse_var(name: &str) -> Option<i32> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Group size requested by the launch environment, if any.
pub fn group_size() -> Option<i32> {
    LAUNCHER_VARS.iter().find_map(|name| parse_var(name))
}

/// Name of the variable [`group_size`] took its value from.
pub fn group_size_source() -> Option<&'static str> {
    LAUNCHER_VARS
        .iter()
        .copied()
        .find(|name| parse_var(name).is_some())
}

/// Group size from the environment, or [`DEFAULT_GROUP_SIZE`].
pub fn group_size_or_default() -> i32 {
    group_size().unwrap_or(DEFAULT_GROUP_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests that mutate environment variables are combined into a single test
    /// to avoid data races when tests run in parallel.
    #[test]
    fn launcher_var_precedence() {
        let saved: Vec<(&str, Option<String>)> = LAUNCHER_VARS
            .iter()
            .map(|name| (*name, env::var(name).ok()))
            .collect();
        for name in LAUNCHER_VARS {
            env::remove_var(name);
        }

        assert_eq!(group_size(), None);
        assert_eq!(group_size_or_default(), DEFAULT_GROUP_SIZE);

        // --- SLURM is the last resort ---
        env::set_var("SLURM_NTASKS", "16");
        assert_eq!(group_size(), Some(16));
        assert_eq!(group_size_source(), Some("SLURM_NTASKS"));

        // --- launcher variables beat SLURM ---
        env::set_var("OMPI_COMM_WORLD_SIZE", " 8 ");
        assert_eq!(group_size(), Some(8));

        // --- unparsable values are skipped ---
        env::set_var(NP_VAR, "many");
        assert_eq!(group_size(), Some(8));
        assert_eq!(group_size_source(), Some("OMPI_COMM_WORLD_SIZE"));

        // --- the explicit variable wins ---
        env::set_var(NP_VAR, "3");
        assert_eq!(group_size(), Some(3));
        assert_eq!(group_size_source(), Some(NP_VAR));

        for (name, value) in saved {
            match value {
                Some(value) => env::set_var(name, value),
                None => env::remove_var(name),
            }
        }
    }
}
