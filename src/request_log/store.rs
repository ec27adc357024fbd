//! 生成请求存储
//!
//! 只追加写入：每次生成尝试一条记录，核心流程不更新、不删除。

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};

use crate::caption::types::VibeCategory;

use super::model::{CaptionRecord, NewCaptionRecord};
use super::types::{
    AnalyticsSummary, DailyAnalytics, EventTypeCount, RequestListResponse, RequestQuery,
    RequestStats, VibeCount,
};

/// 生成请求存储接口
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// 写入一条记录，返回记录 ID
    async fn record(&self, record: NewCaptionRecord) -> Result<String>;

    /// 全量计数
    async fn stats(&self) -> Result<RequestStats>;

    /// 最近 `window_days` 天的统计
    async fn analytics(&self, window_days: u32) -> Result<AnalyticsSummary>;
}

/// 底层 SQLite 存储（同步）
struct CaptionStore {
    conn: Mutex<Connection>,
}

impl CaptionStore {
    fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS caption_requests (
                id TEXT PRIMARY KEY,
                event_name TEXT NOT NULL,
                event_type TEXT NOT NULL,
                location TEXT NOT NULL,
                speakers TEXT NOT NULL,
                key_learnings TEXT NOT NULL,
                length TEXT NOT NULL,
                vibe INTEGER NOT NULL,
                language TEXT NOT NULL,
                generated_caption TEXT NOT NULL DEFAULT '',
                success INTEGER NOT NULL,
                error_message TEXT,
                processing_time REAL NOT NULL DEFAULT 0,
                ip_address TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_caption_created_at ON caption_requests(created_at);
            CREATE INDEX IF NOT EXISTS idx_caption_event_type ON caption_requests(event_type);
            CREATE TABLE IF NOT EXISTS caption_analytics (
                date TEXT PRIMARY KEY,
                total_requests INTEGER NOT NULL DEFAULT 0,
                successful_requests INTEGER NOT NULL DEFAULT 0,
                failed_requests INTEGER NOT NULL DEFAULT 0,
                avg_processing_time REAL NOT NULL DEFAULT 0,
                most_popular_event_type TEXT NOT NULL DEFAULT '',
                most_popular_vibe_range TEXT NOT NULL DEFAULT ''
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn insert(&self, id: &str, created_at: &DateTime<Utc>, record: &NewCaptionRecord) -> Result<()> {
        let conn = self.conn.lock();
        let input = &record.input;
        conn.execute(
            "INSERT INTO caption_requests (id, event_name, event_type, location, speakers, key_learnings, length, vibe, language, generated_caption, success, error_message, processing_time, ip_address, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            rusqlite::params![
                id,
                input.event_name,
                input.event_type,
                input.location,
                input.speakers,
                input.key_learnings,
                input.length.as_str(),
                input.vibe as i64,
                input.language.as_str(),
                record.outcome.caption(),
                record.outcome.is_success() as i32,
                record.outcome.error_message(),
                record.processing_time,
                record.ip_address,
                format_timestamp(created_at),
            ],
        )?;
        Ok(())
    }

    fn stats(&self) -> Result<RequestStats> {
        let conn = self.conn.lock();
        let (total_requests, successful_requests): (u64, u64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(success), 0) FROM caption_requests",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(RequestStats {
            total_requests,
            successful_requests,
        })
    }

    fn analytics(&self, since: &str, window_days: u32) -> Result<AnalyticsSummary> {
        let conn = self.conn.lock();

        let (total_requests, successful_requests, avg_processing_time): (u64, u64, f64) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(success), 0), COALESCE(AVG(processing_time), 0)
                 FROM caption_requests WHERE created_at >= ?1",
                [since],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        let mut stmt = conn.prepare(
            "SELECT event_type, COUNT(*) AS c FROM caption_requests WHERE created_at >= ?1
             GROUP BY event_type ORDER BY c DESC, event_type ASC LIMIT 5",
        )?;
        let popular_event_types = stmt
            .query_map([since], |row| {
                Ok(EventTypeCount {
                    event_type: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT vibe, COUNT(*) AS c FROM caption_requests WHERE created_at >= ?1
             GROUP BY vibe ORDER BY c DESC, vibe ASC LIMIT 5",
        )?;
        let popular_vibes = stmt
            .query_map([since], |row| {
                Ok(VibeCount {
                    vibe: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(AnalyticsSummary {
            total_requests,
            successful_requests,
            failed_requests: total_requests - successful_requests,
            avg_processing_time,
            popular_event_types,
            popular_vibes,
            period: format!("{} days", window_days),
        })
    }

    /// 重新计算并写入某日的聚合统计
    fn refresh_daily(&self, date: &str) -> Result<DailyAnalytics> {
        let conn = self.conn.lock();

        let (total_requests, successful_requests, avg_processing_time): (u64, u64, f64) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(success), 0), COALESCE(AVG(processing_time), 0)
                 FROM caption_requests WHERE substr(created_at, 1, 10) = ?1",
                [date],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        let most_popular_event_type: String = conn
            .query_row(
                "SELECT event_type FROM caption_requests WHERE substr(created_at, 1, 10) = ?1
                 GROUP BY event_type ORDER BY COUNT(*) DESC, event_type ASC LIMIT 1",
                [date],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or_default();

        let mut stmt = conn.prepare(
            "SELECT vibe, COUNT(*) FROM caption_requests WHERE substr(created_at, 1, 10) = ?1 GROUP BY vibe",
        )?;
        let vibe_counts = stmt
            .query_map([date], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, u64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let most_popular_vibe_range = most_popular_vibe_range(&vibe_counts);

        let daily = DailyAnalytics {
            date: date.to_string(),
            total_requests,
            successful_requests,
            failed_requests: total_requests - successful_requests,
            avg_processing_time,
            most_popular_event_type,
            most_popular_vibe_range,
        };

        conn.execute(
            "INSERT INTO caption_analytics (date, total_requests, successful_requests, failed_requests, avg_processing_time, most_popular_event_type, most_popular_vibe_range)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(date) DO UPDATE SET
                total_requests = excluded.total_requests,
                successful_requests = excluded.successful_requests,
                failed_requests = excluded.failed_requests,
                avg_processing_time = excluded.avg_processing_time,
                most_popular_event_type = excluded.most_popular_event_type,
                most_popular_vibe_range = excluded.most_popular_vibe_range",
            rusqlite::params![
                daily.date,
                daily.total_requests as i64,
                daily.successful_requests as i64,
                daily.failed_requests as i64,
                daily.avg_processing_time,
                daily.most_popular_event_type,
                daily.most_popular_vibe_range,
            ],
        )?;

        Ok(daily)
    }

    fn daily(&self, days: u32) -> Result<Vec<DailyAnalytics>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT date, total_requests, successful_requests, failed_requests, avg_processing_time, most_popular_event_type, most_popular_vibe_range
             FROM caption_analytics ORDER BY date DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([days as i64], |row| {
                Ok(DailyAnalytics {
                    date: row.get(0)?,
                    total_requests: row.get(1)?,
                    successful_requests: row.get(2)?,
                    failed_requests: row.get(3)?,
                    avg_processing_time: row.get(4)?,
                    most_popular_event_type: row.get(5)?,
                    most_popular_vibe_range: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn query(&self, filter: &RequestQuery) -> Result<RequestListResponse> {
        let conn = self.conn.lock();
        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter.page_size.unwrap_or(25).clamp(1, 200);
        let offset = (page - 1) as i64 * page_size as i64;

        let mut where_clauses = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(success) = filter.success {
            where_clauses.push(format!("success = ?{}", params.len() + 1));
            params.push(Box::new(success as i32));
        }
        if let Some(ref event_type) = filter.event_type {
            where_clauses.push(format!("event_type = ?{}", params.len() + 1));
            params.push(Box::new(event_type.clone()));
        }
        if let Some(ref language) = filter.language {
            where_clauses.push(format!("language = ?{}", params.len() + 1));
            params.push(Box::new(language.clone()));
        }
        if let Some(ref length) = filter.length {
            where_clauses.push(format!("length = ?{}", params.len() + 1));
            params.push(Box::new(length.clone()));
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM caption_requests {}", where_sql);
        let total: u64 = conn.query_row(
            &count_sql,
            rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
            |row| row.get(0),
        )?;

        let query_sql = format!(
            "SELECT id, created_at, event_name, event_type, location, speakers, key_learnings, length, vibe, language, generated_caption, success, error_message, processing_time, ip_address
             FROM caption_requests {} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            where_sql,
            params.len() + 1,
            params.len() + 2
        );
        params.push(Box::new(page_size as i64));
        params.push(Box::new(offset));

        let mut stmt = conn.prepare(&query_sql)?;
        let records = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                |row| {
                    Ok(CaptionRecord {
                        id: row.get(0)?,
                        created_at: row.get(1)?,
                        event_name: row.get(2)?,
                        event_type: row.get(3)?,
                        location: row.get(4)?,
                        speakers: row.get(5)?,
                        key_learnings: row.get(6)?,
                        length: row.get(7)?,
                        vibe: row.get(8)?,
                        language: row.get(9)?,
                        generated_caption: row.get(10)?,
                        success: row.get::<_, i32>(11)? != 0,
                        error_message: row.get(12)?,
                        processing_time: row.get(13)?,
                        ip_address: row.get(14)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(RequestListResponse {
            total,
            page,
            page_size,
            records,
        })
    }
}

/// 时间戳统一为 UTC RFC3339（微秒，Z 后缀），保证字典序即时间序
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// 出现次数最多的 vibe 类别，平局取分数区间更低者
fn most_popular_vibe_range(vibe_counts: &[(i64, u64)]) -> String {
    let categories = [
        VibeCategory::Formal,
        VibeCategory::Conversational,
        VibeCategory::HighEnergy,
    ];
    let mut totals = [0u64; 3];
    for &(vibe, count) in vibe_counts {
        let category = VibeCategory::from_score(vibe.clamp(0, 100) as u8);
        if let Some(idx) = categories.iter().position(|c| *c == category) {
            totals[idx] += count;
        }
    }

    let mut best: Option<(usize, u64)> = None;
    for (idx, &total) in totals.iter().enumerate() {
        if total > best.map(|(_, t)| t).unwrap_or(0) {
            best = Some((idx, total));
        }
    }
    best.map(|(idx, _)| categories[idx].as_str().to_string())
        .unwrap_or_default()
}

/// 异步请求存储服务（公开 API）
pub struct CaptionLog {
    store: Arc<CaptionStore>,
}

impl CaptionLog {
    /// 打开（或创建）数据库
    pub fn open(db_path: &str) -> Result<Self> {
        let store = Arc::new(CaptionStore::new(db_path)?);
        Ok(Self { store })
    }

    /// 内存数据库
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    async fn record_at(&self, record: NewCaptionRecord, created_at: DateTime<Utc>) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let store = self.store.clone();
        let row_id = id.clone();
        tokio::task::spawn_blocking(move || {
            store.insert(&row_id, &created_at, &record)?;
            // 日统计刷新失败不影响记录写入
            let date = created_at.date_naive().to_string();
            if let Err(e) = store.refresh_daily(&date) {
                tracing::warn!("刷新日统计失败 ({}): {}", date, e);
            }
            Ok::<_, anyhow::Error>(())
        })
        .await??;
        Ok(id)
    }

    /// 查询请求记录
    pub async fn query(&self, filter: RequestQuery) -> Result<RequestListResponse> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.query(&filter)).await?
    }

    /// 最近 `days` 天的日统计
    pub async fn daily(&self, days: u32) -> Result<Vec<DailyAnalytics>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.daily(days)).await?
    }
}

#[async_trait]
impl RequestStore for CaptionLog {
    async fn record(&self, record: NewCaptionRecord) -> Result<String> {
        self.record_at(record, Utc::now()).await
    }

    async fn stats(&self) -> Result<RequestStats> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.stats()).await?
    }

    async fn analytics(&self, window_days: u32) -> Result<AnalyticsSummary> {
        let since = (Utc::now().date_naive() - chrono::Duration::days(window_days as i64)).to_string();
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.analytics(&since, window_days)).await?
    }
}
