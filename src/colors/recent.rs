// downloader-core - Download task wrappers with progress tracking
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Recently used colors, most recent first
//!
//! A store is owned by whoever needs it (one per session or window); there is
//! no process-wide list.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default number of colors kept
pub const DEFAULT_CAPACITY: usize = 10;

/// 24-bit RGB color, written as `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid color '{0}', expected #RRGGBB")]
pub struct ParseRgbError(String);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = ParseRgbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseRgbError(s.to_string()));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseRgbError(s.to_string()))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ParseRgbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

/// Bounded most-recent-first color list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRecentColors")]
pub struct RecentColorsStore {
    capacity: usize,
    colors: VecDeque<Rgb>,
}

/// On-disk form; bounds are enforced when converting into the store
#[derive(Deserialize)]
struct StoredRecentColors {
    #[serde(default = "default_capacity")]
    capacity: usize,
    #[serde(default)]
    colors: VecDeque<Rgb>,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl From<StoredRecentColors> for RecentColorsStore {
    fn from(stored: StoredRecentColors) -> Self {
        let mut store = Self::with_capacity(stored.capacity);
        let mut colors = stored.colors;
        colors.truncate(store.capacity);
        store.colors = colors;
        store
    }
}

impl Default for RecentColorsStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RecentColorsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store keeping at most `capacity` colors (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            colors: VecDeque::with_capacity(capacity),
        }
    }

    /// Record a color as most recently used.
    ///
    /// A color already in the list moves to the front; otherwise it is
    /// inserted and the oldest one is evicted when the list is full.
    pub fn add(&mut self, color: Rgb) {
        if let Some(index) = self.colors.iter().position(|&c| c == color) {
            self.colors.remove(index);
        } else if self.colors.len() >= self.capacity {
            self.colors.pop_back();
        }
        self.colors.push_front(color);
    }

    pub fn most_recent(&self) -> Option<Rgb> {
        self.colors.front().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rgb> {
        self.colors.iter()
    }

    pub fn contains(&self, color: Rgb) -> bool {
        self.colors.contains(&color)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.colors.clear();
    }
}
