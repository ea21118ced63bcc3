//
// Copyright (c) tsfdb contributors
// See License.txt for details
use tsfdb::cli;

/// tsfdbd is an alias to the main function in cli::daemon, selected by the
/// binary's own name (see `cli::main`).
fn main() {
    cli::main()
}
