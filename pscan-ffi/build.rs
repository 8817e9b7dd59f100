// Copyright pscan contributors
// SPDX-License-Identifier: Apache-2.0

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    build_common::generate_and_configure_header("pscan.h");
}
