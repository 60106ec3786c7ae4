//! 通知邮件分发器
//!
//! 通知创建成功后入队一个分发任务，由独立的后台任务消费：
//! 解析收件人、分批发送邮件、批间节流。入队是即发即忘的，
//! 创建接口的响应时间与收件人规模无关，单封邮件失败只影响
//! 该收件人，不会中断所在批次或整个任务。

pub mod mailer;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use once_cell::sync::OnceCell;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::{CollegeHubError, Result};
use crate::models::notifications::entities::Notification;
use crate::models::users::entities::User;
use crate::storage::Storage;

pub use mailer::{LogMailer, Mailer};

/// 邮件收件人
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub email: String,
    pub name: String,
}

impl From<&User> for Recipient {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            name: user.profile.profile_name.clone(),
        }
    }
}

/// 分发任务
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub id: Uuid,
    pub notification_id: i64,
    pub enqueued_at: DateTime<Utc>,
}

/// 单次 fan-out 的结果统计
#[derive(Debug, Default, PartialEq)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub failed: usize,
}

static DISPATCH_SENDER: OnceCell<mpsc::UnboundedSender<DispatchJob>> = OnceCell::new();

/// 全局分发队列
///
/// start 在服务启动时调用一次，之后任意处调用 enqueue 入队。
/// 队列无界，生产速率受创建接口的权限与校验约束。
pub struct DispatchQueue;

impl DispatchQueue {
    /// 启动后台分发任务
    pub fn start(storage: Arc<dyn Storage>, mailer: Arc<dyn Mailer>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<DispatchJob>();

        if DISPATCH_SENDER.set(tx).is_err() {
            warn!("Dispatch queue already started, ignoring duplicate start");
            return;
        }

        tokio::spawn(async move {
            info!("Notification dispatch worker started");
            while let Some(job) = rx.recv().await {
                let job_id = job.id;
                if let Err(err) = Self::process_job(&storage, &mailer, job).await {
                    error!("Dispatch job {} failed: {}", job_id, err);
                }
            }
            info!("Notification dispatch worker stopped");
        });
    }

    /// 入队分发任务，立即返回
    ///
    /// 邮件分发被配置关闭时静默跳过，通知本身不受影响。
    pub fn enqueue(notification_id: i64) -> Result<Option<DispatchJob>> {
        let config = AppConfig::get();
        if !config.email.enabled {
            info!(
                "Email notifications disabled, skipping dispatch for notification {}",
                notification_id
            );
            return Ok(None);
        }

        let job = DispatchJob {
            id: Uuid::new_v4(),
            notification_id,
            enqueued_at: Utc::now(),
        };

        let sender = DISPATCH_SENDER
            .get()
            .ok_or_else(|| CollegeHubError::dispatch_queue("Dispatch queue not started"))?;

        sender.send(job.clone()).map_err(|_| {
            CollegeHubError::dispatch_queue("Dispatch worker is no longer running")
        })?;

        info!(
            "Enqueued dispatch job {} for notification {}",
            job.id, job.notification_id
        );
        Ok(Some(job))
    }

    async fn process_job(
        storage: &Arc<dyn Storage>,
        mailer: &Arc<dyn Mailer>,
        job: DispatchJob,
    ) -> Result<()> {
        let Some(notification) = storage.get_notification_by_id(job.notification_id).await? else {
            warn!(
                "Dispatch job {}: notification {} no longer exists, skipping",
                job.id, job.notification_id
            );
            return Ok(());
        };

        if !notification.is_active {
            warn!(
                "Dispatch job {}: notification {} was deactivated, skipping",
                job.id, job.notification_id
            );
            return Ok(());
        }

        let users = storage.find_notification_recipients(&notification).await?;
        if users.is_empty() {
            info!(
                "Dispatch job {}: no eligible recipients for notification {}",
                job.id, job.notification_id
            );
            return Ok(());
        }

        let recipients: Vec<Recipient> = users.iter().map(Recipient::from).collect();
        let config = AppConfig::get();

        let outcome = fan_out(
            mailer.as_ref(),
            &notification,
            &recipients,
            config.email.batch_size,
            Duration::from_secs(config.email.batch_delay_secs),
        )
        .await;

        info!(
            "Dispatch job {} finished for notification {}: {} delivered, {} failed of {} recipients",
            job.id,
            job.notification_id,
            outcome.delivered,
            outcome.failed,
            recipients.len()
        );
        Ok(())
    }
}

/// 分批发送邮件
///
/// 每批最多 batch_size 封并发投递，整批结果收齐后再进入下一批，
/// 相邻批之间等待 batch_delay。失败的收件人记录日志后跳过。
pub async fn fan_out(
    mailer: &dyn Mailer,
    notification: &Notification,
    recipients: &[Recipient],
    batch_size: usize,
    batch_delay: Duration,
) -> DispatchOutcome {
    let mut outcome = DispatchOutcome::default();
    let batch_count = recipients.len().div_ceil(batch_size.max(1));

    for (index, batch) in recipients.chunks(batch_size.max(1)).enumerate() {
        let sends = batch.iter().map(|recipient| {
            mailer.send_notification_email(
                &recipient.email,
                &notification.title,
                &notification.message,
                &recipient.name,
            )
        });

        for (recipient, result) in batch.iter().zip(join_all(sends).await) {
            match result {
                Ok(()) => outcome.delivered += 1,
                Err(err) => {
                    outcome.failed += 1;
                    warn!(
                        "Failed to send notification {} email to {}: {}",
                        notification.id, recipient.email, err
                    );
                }
            }
        }

        // 批间节流，最后一批之后不等待
        if index + 1 < batch_count {
            tokio::time::sleep(batch_delay).await;
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notifications::entities::{
        Audience, NotificationPriority, NotificationType,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct RecordingMailer {
        sent: Mutex<Vec<(String, Instant)>>,
        failing: Vec<String>,
    }

    impl RecordingMailer {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing: Vec::new(),
            }
        }

        fn failing_for(addresses: &[&str]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing: addresses.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_notification_email(
            &self,
            to: &str,
            _title: &str,
            _message: &str,
            _recipient_name: &str,
        ) -> crate::errors::Result<()> {
            if self.failing.iter().any(|f| f == to) {
                return Err(crate::errors::CollegeHubError::mail_delivery(format!(
                    "simulated bounce for {to}"
                )));
            }
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), Instant::now()));
            Ok(())
        }
    }

    fn sample_notification() -> Notification {
        Notification {
            id: 1,
            title: "Midterm schedule published".to_string(),
            message: "The midterm examination schedule is now available.".to_string(),
            notification_type: NotificationType::Academic,
            priority: NotificationPriority::High,
            target_audience: vec![Audience::All],
            target_departments: vec![],
            target_semesters: vec![],
            created_by: 1,
            is_active: true,
            expires_at: None,
            attachments: vec![],
            view_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn recipients(count: usize) -> Vec<Recipient> {
        (0..count)
            .map(|i| Recipient {
                email: format!("student{i}@campus.edu"),
                name: format!("Student {i}"),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn fan_out_batches_with_throttle_and_failure_isolation() {
        let mailer = RecordingMailer::failing_for(&["student37@campus.edu"]);
        let notification = sample_notification();
        let all = recipients(120);

        let start = Instant::now();
        let outcome = fan_out(&mailer, &notification, &all, 50, Duration::from_secs(1)).await;

        // 120 人分三批 (50/50/20)，1 人失败被隔离
        assert_eq!(outcome.delivered, 119);
        assert_eq!(outcome.failed, 1);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 119);
        assert!(!sent.iter().any(|(to, _)| to == "student37@campus.edu"));

        // 第一批立即发出，后两批分别等待 1s 与 2s，末批后不再等待
        for (to, at) in sent.iter() {
            let index: usize = to
                .trim_start_matches("student")
                .trim_end_matches("@campus.edu")
                .parse()
                .unwrap();
            let expected = Duration::from_secs((index / 50) as u64);
            assert_eq!(at.duration_since(start), expected, "wrong batch for {to}");
        }
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn fan_out_single_batch_skips_delay() {
        let mailer = RecordingMailer::new();
        let notification = sample_notification();
        let all = recipients(50);

        let start = Instant::now();
        let outcome = fan_out(&mailer, &notification, &all, 50, Duration::from_secs(1)).await;

        assert_eq!(outcome.delivered, 50);
        assert_eq!(outcome.failed, 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn fan_out_failure_does_not_abort_batch() {
        let mailer = RecordingMailer::failing_for(&[
            "student0@campus.edu",
            "student1@campus.edu",
            "student2@campus.edu",
        ]);
        let notification = sample_notification();
        let all = recipients(10);

        let outcome = fan_out(&mailer, &notification, &all, 50, Duration::from_secs(1)).await;

        assert_eq!(outcome.delivered, 7);
        assert_eq!(outcome.failed, 3);
    }

    #[tokio::test]
    async fn fan_out_empty_recipients() {
        let mailer = RecordingMailer::new();
        let notification = sample_notification();

        let outcome = fan_out(&mailer, &notification, &[], 50, Duration::from_secs(1)).await;

        assert_eq!(outcome, DispatchOutcome::default());
    }
}
