// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use keepsake_core::Container;
use std::collections::BTreeMap;

// ANSI color codes
pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const GREEN: &str = "\x1b[32m";
pub const RED: &str = "\x1b[31m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

// Visual symbols
pub const CHECK: &str = "✓";
pub const CROSS: &str = "✗";

pub fn print_title(title: &str) {
    println!("\n{}{}━━━ {} ━━━{}", BOLD, CYAN, title, RESET);
}

pub fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("  {}{:<12}{} {}", BOLD, label, RESET, value);
}

pub fn print_success(message: &str) {
    println!("{}{} {} {}{}", BOLD, GREEN, CHECK, message, RESET);
}

pub fn print_error(message: &str) {
    eprintln!("{}{} {} {}{}", BOLD, RED, CROSS, message, RESET);
}

pub fn print_warning(message: &str) {
    println!("{}{}! {}{}", BOLD, YELLOW, message, RESET);
}

/// Spawned records grouped by template reference.
pub fn spawned_by_template(container: &Container) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for record in &container.spawned {
        *counts.entry(record.template_reference.as_str()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake_core::SceneIdentity;

    #[test]
    fn spawned_records_are_grouped() {
        let mut container = Container::new(SceneIdentity::new(0, "Main"));
        container.push_spawned("grenade", None);
        container.push_spawned("crate", None);
        container.push_spawned("grenade", None);

        let counts = spawned_by_template(&container);
        assert_eq!(counts.get("grenade"), Some(&2));
        assert_eq!(counts.get("crate"), Some(&1));
        assert_eq!(counts.keys().copied().collect::<Vec<_>>(), vec!["crate", "grenade"]);
    }
}
