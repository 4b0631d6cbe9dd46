// ==============================================================================
// lib.rs - Variant Triage Library
// ==============================================================================
// Description: Library interface for variant filtering and ClinVar enrichment
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

pub mod config;
pub mod evidence;
pub mod filters;
pub mod gene_panel;
pub mod models;
pub mod output;
pub mod parsers;
pub mod processor;
