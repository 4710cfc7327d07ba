// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SenteChain - Custodial Demo Wallet
//!
//! A user logs in with an email address or phone number, receives a derived
//! wallet address, and moves a 6-decimal stablecoin (sUSDT) through the
//! SenteToken / SenteVault contracts on Base Sepolia or a local Hardhat node.
//!
//! ## Modules
//!
//! - `api` - Backend HTTP API handlers (Axum)
//! - `auth` - Session tokens (HS256 JWT)
//! - `blockchain` - Contract bindings, the read/write facade and its alloy backend
//! - `identity` - Login identifiers and address derivation
//! - `storage` - Backend user store (redb or in-memory)
//! - `wallet` - Client-side wallet core: provider adapter, refresh
//!   coordinator, session, contacts, settings, history, setup checks

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;
pub mod wallet;
