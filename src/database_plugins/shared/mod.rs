// ABOUTME: Shared database utilities used by the SQLite backend
// ABOUTME: Hosts the RAII transaction guard and row mapping helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Model <-> SQL column conversion helpers (timestamps, enums, scope lists)
pub mod mappers;

/// RAII transaction guard with rollback on drop
pub mod transactions;
