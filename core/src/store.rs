//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database. The engine and the
//! submission procedures call store methods — they never execute SQL
//! directly.
//!
//! Writes for one aggregate are batched in a single transaction so a
//! concurrent reader never observes a partially updated group. Rows for
//! different treasuries are disjoint, so independent treasury runs can
//! share a database file safely.

use crate::{
    error::PayoutResult,
    record::{PendingAward, PendingRoyalty, Treasury},
    types::{ChainFamily, RecordId, StatusCode, TreasuryId, UserId},
};
use rusqlite::{params, types::Type, Connection, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

pub struct PayoutStore {
    conn: Connection,
}

impl PayoutStore {
    pub fn open(path: &str) -> PayoutResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PayoutResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PayoutResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_payouts.sql"))?;
        Ok(())
    }

    // ── Selection ──────────────────────────────────────────────

    /// All unpaid awards for one treasury, joined with the recipient's
    /// addresses and the treasury configuration, oldest first.
    ///
    /// Selection is by null transaction hash alone: a record that
    /// failed in an earlier run is picked up again, while a submitted
    /// record is excluded forever.
    pub fn pending_awards(&self, treasury_id: TreasuryId) -> PayoutResult<Vec<PendingAward>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT a.id, a.user_id, a.treasury_id, a.value, a.royalty_value, a.created_at,
                    u.evm_address, u.substrate_address,
                    {TREASURY_COLUMNS}
             FROM award a
             JOIN treasury t ON t.id = a.treasury_id
             LEFT JOIN user u ON u.id = a.user_id
             WHERE a.transaction_hash IS NULL AND a.treasury_id = ?1
             ORDER BY a.created_at ASC, a.id ASC"
        ))?;
        let rows = stmt.query_map(params![treasury_id], |row| {
            Ok(PendingAward {
                id: row.get(0)?,
                user_id: row.get(1)?,
                treasury_id: row.get(2)?,
                value: decimal_column(row, 3)?,
                royalty_value: optional_decimal_column(row, 4)?,
                created_at: row.get(5)?,
                evm_address: row.get(6)?,
                substrate_address: row.get(7)?,
                treasury: treasury_from_row(row, 8)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// All awards with an unpaid royalty portion for one treasury,
    /// oldest first.
    pub fn pending_royalties(&self, treasury_id: TreasuryId) -> PayoutResult<Vec<PendingRoyalty>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT a.id, a.user_id, a.treasury_id, a.royalty_value,
                    {TREASURY_COLUMNS}
             FROM award a
             JOIN treasury t ON t.id = a.treasury_id
             WHERE a.royalty_value IS NOT NULL
               AND a.royalty_transaction_hash IS NULL
               AND a.treasury_id = ?1
             ORDER BY a.created_at ASC, a.id ASC"
        ))?;
        let rows = stmt.query_map(params![treasury_id], |row| {
            Ok(PendingRoyalty {
                id: row.get(0)?,
                user_id: row.get(1)?,
                treasury_id: row.get(2)?,
                royalty_value: decimal_column(row, 3)?,
                treasury: treasury_from_row(row, 4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Status write-back ──────────────────────────────────────

    /// Record a successful submission on every member of an aggregate,
    /// as one transaction.
    pub fn mark_submitted(
        &self,
        ids: &[RecordId],
        tx_hash: &str,
        timestamp: i64,
        min_balance_bumped: bool,
        sent_existential_deposit: bool,
    ) -> PayoutResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE award
                 SET status = ?1, transaction_hash = ?2, transaction_timestamp = ?3,
                     min_balance_bumped = ?4, sent_existential_deposit = ?5
                 WHERE id = ?6",
            )?;
            for id in ids {
                stmt.execute(params![
                    StatusCode::Submitted.as_i64(),
                    tx_hash,
                    timestamp,
                    if min_balance_bumped { 1 } else { 0 },
                    if sent_existential_deposit { 1 } else { 0 },
                    id,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Record a classified failure on every member of an aggregate, as
    /// one transaction. The transaction hash stays null so the records
    /// are retriable by a later run.
    pub fn mark_failed(&self, ids: &[RecordId], status: StatusCode) -> PayoutResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE award SET status = ?1 WHERE id = ?2")?;
            for id in ids {
                stmt.execute(params![status.as_i64(), id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn mark_royalty_submitted(
        &self,
        id: RecordId,
        tx_hash: &str,
        timestamp: i64,
        min_balance_bumped: bool,
        sent_existential_deposit: bool,
    ) -> PayoutResult<()> {
        self.conn.execute(
            "UPDATE award
             SET royalty_status = ?1, royalty_transaction_hash = ?2,
                 royalty_transaction_timestamp = ?3,
                 royalty_min_balance_bumped = ?4,
                 royalty_sent_existential_deposit = ?5
             WHERE id = ?6",
            params![
                StatusCode::Submitted.as_i64(),
                tx_hash,
                timestamp,
                if min_balance_bumped { 1 } else { 0 },
                if sent_existential_deposit { 1 } else { 0 },
                id,
            ],
        )?;
        Ok(())
    }

    pub fn mark_royalty_failed(&self, id: RecordId, status: StatusCode) -> PayoutResult<()> {
        self.conn.execute(
            "UPDATE award SET royalty_status = ?1 WHERE id = ?2",
            params![status.as_i64(), id],
        )?;
        Ok(())
    }

    // ── Existential deposits ───────────────────────────────────

    /// Has this user ever received the one-time top-up on this chain?
    pub fn existential_deposit_exists(
        &self,
        user_id: UserId,
        chain_prefix: u16,
    ) -> PayoutResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM existential_deposit
             WHERE user_id = ?1 AND chain_prefix = ?2",
            params![user_id, chain_prefix],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn insert_existential_deposit(
        &self,
        user_id: UserId,
        chain_prefix: u16,
        tx_hash: &str,
    ) -> PayoutResult<()> {
        self.conn.execute(
            "INSERT INTO existential_deposit (user_id, chain_prefix, transaction_hash)
             VALUES (?1, ?2, ?3)",
            params![user_id, chain_prefix, tx_hash],
        )?;
        Ok(())
    }

    // ── Fixtures ───────────────────────────────────────────────
    // Treasuries, users, and awards are created by components upstream
    // of the engine. These inserts exist for tooling and tests.

    pub fn insert_treasury(&self, t: &Treasury) -> PayoutResult<()> {
        self.conn.execute(
            "INSERT INTO treasury (
                id, name, chain_family, coin_name, rpc_url, wallet_secret,
                chain_prefix, chain_options, is_native, token_address,
                token_decimals, asset_id, royalty_enabled, royalty_address,
                royalty_percentage, send_min_balance, send_existential_deposit
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                t.id,
                t.name,
                t.family.as_str(),
                t.coin_name,
                t.rpc_url,
                t.wallet_secret,
                t.chain_prefix,
                t.chain_options,
                if t.is_native { 1 } else { 0 },
                t.token_address,
                t.token_decimals,
                t.asset_id,
                if t.royalty_enabled { 1 } else { 0 },
                t.royalty_address,
                t.royalty_percentage,
                if t.send_min_balance { 1 } else { 0 },
                if t.send_existential_deposit { 1 } else { 0 },
            ],
        )?;
        Ok(())
    }

    pub fn insert_user(
        &self,
        id: UserId,
        evm_address: Option<&str>,
        substrate_address: Option<&str>,
    ) -> PayoutResult<()> {
        self.conn.execute(
            "INSERT INTO user (id, evm_address, substrate_address) VALUES (?1, ?2, ?3)",
            params![id, evm_address, substrate_address],
        )?;
        Ok(())
    }

    pub fn insert_award(
        &self,
        user_id: UserId,
        treasury_id: TreasuryId,
        value: &Decimal,
        royalty_value: Option<&Decimal>,
        created_at: i64,
    ) -> PayoutResult<RecordId> {
        self.conn.execute(
            "INSERT INTO award (user_id, treasury_id, value, royalty_value, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                treasury_id,
                value.to_string(),
                royalty_value.map(|v| v.to_string()),
                created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ── Inspection helpers ─────────────────────────────────────

    /// Full persisted state of one award, for tooling and tests.
    pub fn award(&self, id: RecordId) -> PayoutResult<AwardState> {
        self.conn
            .query_row(
                "SELECT status, transaction_hash, transaction_timestamp,
                        min_balance_bumped, sent_existential_deposit,
                        royalty_status, royalty_transaction_hash,
                        royalty_min_balance_bumped, royalty_sent_existential_deposit
                 FROM award WHERE id = ?1",
                params![id],
                |row| {
                    Ok(AwardState {
                        status: status_column(row, 0)?,
                        transaction_hash: row.get(1)?,
                        transaction_timestamp: row.get(2)?,
                        min_balance_bumped: row.get::<_, i64>(3)? != 0,
                        sent_existential_deposit: row.get::<_, i64>(4)? != 0,
                        royalty_status: status_column(row, 5)?,
                        royalty_transaction_hash: row.get(6)?,
                        royalty_min_balance_bumped: row.get::<_, i64>(7)? != 0,
                        royalty_sent_existential_deposit: row.get::<_, i64>(8)? != 0,
                    })
                },
            )
            .map_err(Into::into)
    }

    pub fn pending_award_count(&self, treasury_id: TreasuryId) -> PayoutResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM award
                 WHERE treasury_id = ?1 AND transaction_hash IS NULL",
                params![treasury_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn existential_deposit_count(&self, user_id: UserId) -> PayoutResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM existential_deposit WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}

/// Mutable award columns, read back for inspection.
#[derive(Debug, Clone)]
pub struct AwardState {
    pub status: StatusCode,
    pub transaction_hash: Option<String>,
    pub transaction_timestamp: Option<i64>,
    pub min_balance_bumped: bool,
    pub sent_existential_deposit: bool,
    pub royalty_status: StatusCode,
    pub royalty_transaction_hash: Option<String>,
    pub royalty_min_balance_bumped: bool,
    pub royalty_sent_existential_deposit: bool,
}

/// Treasury column list shared by the two selection queries. The
/// mappers below index relative to where this list starts.
const TREASURY_COLUMNS: &str = "t.id, t.name, t.chain_family, t.coin_name, t.rpc_url, \
     t.wallet_secret, t.chain_prefix, t.chain_options, t.is_native, t.token_address, \
     t.token_decimals, t.asset_id, t.royalty_enabled, t.royalty_address, \
     t.royalty_percentage, t.send_min_balance, t.send_existential_deposit";

fn treasury_from_row(row: &Row<'_>, base: usize) -> rusqlite::Result<Treasury> {
    let family_raw: String = row.get(base + 2)?;
    let family = ChainFamily::parse(&family_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            base + 2,
            Type::Text,
            format!("unknown chain family '{family_raw}'").into(),
        )
    })?;
    Ok(Treasury {
        id: row.get(base)?,
        name: row.get(base + 1)?,
        family,
        coin_name: row.get(base + 3)?,
        rpc_url: row.get(base + 4)?,
        wallet_secret: row.get(base + 5)?,
        chain_prefix: row.get(base + 6)?,
        chain_options: row.get(base + 7)?,
        is_native: row.get::<_, i64>(base + 8)? != 0,
        token_address: row.get(base + 9)?,
        token_decimals: row.get(base + 10)?,
        asset_id: row.get(base + 11)?,
        royalty_enabled: row.get::<_, i64>(base + 12)? != 0,
        royalty_address: row.get(base + 13)?,
        royalty_percentage: row.get(base + 14)?,
        send_min_balance: row.get::<_, i64>(base + 15)? != 0,
        send_existential_deposit: row.get::<_, i64>(base + 16)? != 0,
    })
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

fn optional_decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => Decimal::from_str(&raw)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<StatusCode> {
    let raw: i64 = row.get(idx)?;
    StatusCode::from_i64(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("unknown status code {raw}").into(),
        )
    })
}
