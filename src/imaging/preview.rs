// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Terminal preview of an image as ASCII art

use super::netpbm::Image;

/// Darkest to brightest
const RAMP: &[u8] = b" .:-=+*#%@";

/// Render `image` at most `columns` characters wide
///
/// Terminal cells are roughly twice as tall as they are wide, so every output
/// row covers two rows' worth of pixels.
pub fn render(image: &Image, columns: usize) -> String {
    if image.width == 0 || image.height == 0 || columns == 0 {
        return String::new();
    }

    let columns = columns.min(image.width);
    let rows = ((image.height * columns) / (image.width * 2)).max(1);

    let mut out = String::with_capacity((columns + 1) * rows);
    for row in 0..rows {
        let y = row * image.height / rows;
        for col in 0..columns {
            let x = col * image.width / columns;
            let level = image.luma(x, y) as usize * (RAMP.len() - 1) / 255;
            out.push(RAMP[level] as char);
        }
        out.push('\n');
    }
    out
}
