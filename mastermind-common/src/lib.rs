// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};

/// Number of pins in every secret and every guess.
pub const CODE_LENGTH: usize = 4;

/// A game is lost once this many guesses were made without hitting the code.
pub const MAX_TURNS: usize = 10;

/// All pin colors a code can be built from.
pub const ALL_COLORS: [ColoredPin; 6] = [
    ColoredPin::Red,
    ColoredPin::Green,
    ColoredPin::Blue,
    ColoredPin::Yellow,
    ColoredPin::Orange,
    ColoredPin::Purple,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColoredPin {
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
    Purple,
}

/// A fixed-length sequence of colored pins. The wire shape names every pin
/// position explicitly, which also fixes the length at deserialization time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Code {
    pub pin0: ColoredPin,
    pub pin1: ColoredPin,
    pub pin2: ColoredPin,
    pub pin3: ColoredPin,
}

impl Code {
    pub fn new(pin0: ColoredPin, pin1: ColoredPin, pin2: ColoredPin, pin3: ColoredPin) -> Self {
        Self {
            pin0,
            pin1,
            pin2,
            pin3,
        }
    }

    pub fn pins(&self) -> [ColoredPin; CODE_LENGTH] {
        [self.pin0, self.pin1, self.pin2, self.pin3]
    }
}

/// Outcome of checking one guess against the secret code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GuessResult {
    pub black_pins: u32,
    pub white_pins: u32,
}

impl GuessResult {
    /// A guess wins when every pin matched color and position.
    pub fn is_winning(&self) -> bool {
        self.black_pins as usize == CODE_LENGTH
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    InProgress,
    Won,
    Lost,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }
}

/// Public view of a game. The secret code is never part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResponse {
    pub id: String,
    pub status: GameStatus,
}

/// Score a guess against a secret code.
///
/// Black pins count positions where color and position match. White pins
/// count colors present in both leftovers after removing the exact matches,
/// each color contributing at most the smaller of its two occurrence counts.
pub fn score_guess(secret: &Code, guess: &Code) -> GuessResult {
    let mut black_pins = 0u32;
    let mut secret_left = Vec::new();
    let mut guess_left = Vec::new();

    for (secret_pin, guess_pin) in secret.pins().iter().zip(guess.pins().iter()) {
        if secret_pin == guess_pin {
            black_pins += 1;
        } else {
            secret_left.push(*secret_pin);
            guess_left.push(*guess_pin);
        }
    }

    let mut white_pins = 0u32;
    for color in ALL_COLORS {
        let in_secret = secret_left.iter().filter(|pin| **pin == color).count();
        let in_guess = guess_left.iter().filter(|pin| **pin == color).count();
        white_pins += in_secret.min(in_guess) as u32;
    }

    GuessResult {
        black_pins,
        white_pins,
    }
}
