// src/debug/visualization/mod.rs

// SVG-Ausgabe nur in Debug-Builds
#[cfg(debug_assertions)]
pub mod svg;
