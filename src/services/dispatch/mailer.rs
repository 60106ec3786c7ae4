//! 邮件发送抽象
//!
//! Mailer 是分发器与邮件传输层之间的边界。生产部署接入真实的
//! SMTP/API 传输实现，默认的 LogMailer 只记录日志，便于本地开发
//! 与测试环境在不发信的情况下跑完整个分发流程。

use async_trait::async_trait;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::Result;

/// 邮件传输接口
///
/// 实现方负责单封邮件的投递，失败以 Err 返回；
/// 批次编排、失败隔离与节流由分发器处理。
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_notification_email(
        &self,
        to: &str,
        title: &str,
        message: &str,
        recipient_name: &str,
    ) -> Result<()>;
}

/// 渲染通知邮件正文
///
/// 模板内容来自配置：系统名做抬头，前端地址做登录入口。
pub fn build_notification_html(title: &str, message: &str, recipient_name: &str) -> String {
    let config = AppConfig::get();
    let system_name = &config.app.system_name;
    let login_url = format!("{}/login", config.app.frontend_url.trim_end_matches('/'));

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background-color: #f8f9fa; padding: 20px; text-align: center;">
    <h1 style="color: #007bff; margin: 0;">{system_name}</h1>
  </div>
  <div style="padding: 30px; background-color: white;">
    <h2>{title}</h2>
    <p>Hi {recipient_name},</p>
    <div style="background-color: #f8f9fa; padding: 20px; border-left: 4px solid #007bff; margin: 20px 0;">
      {message}
    </div>
    <p>For more details, please log in to your account on our website.</p>
    <div style="text-align: center; margin: 30px 0;">
      <a href="{login_url}"
         style="background-color: #007bff; color: white; padding: 12px 30px; text-decoration: none; border-radius: 5px; display: inline-block;">
        Login to Portal
      </a>
    </div>
  </div>
  <div style="background-color: #f8f9fa; padding: 20px; text-align: center; color: #6c757d; font-size: 12px;">
    <p>This is an automated message. Please do not reply to this email.</p>
  </div>
</div>"#
    )
}

/// 邮件主题，附带系统名后缀
pub fn build_notification_subject(title: &str) -> String {
    let config = AppConfig::get();
    format!("{} - {}", title, config.app.system_name)
}

/// 只写日志的 Mailer 实现
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_notification_email(
        &self,
        to: &str,
        title: &str,
        message: &str,
        recipient_name: &str,
    ) -> Result<()> {
        let body = build_notification_html(title, message, recipient_name);
        info!(
            "Email delivery (log only): from={}, to={}, subject={}, body={} bytes",
            AppConfig::get().email.from_address,
            to,
            build_notification_subject(title),
            body.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_carries_recipient_and_login_entry() {
        let body = build_notification_html("Exam hall change", "Room moved to B204.", "Priya");
        assert!(body.contains("Hi Priya,"));
        assert!(body.contains("Room moved to B204."));
        assert!(body.contains("/login"));
        assert!(body.contains(&AppConfig::get().app.system_name));
    }

    #[test]
    fn subject_carries_system_name() {
        let subject = build_notification_subject("Exam hall change");
        assert!(subject.starts_with("Exam hall change - "));
    }

    #[tokio::test]
    async fn log_mailer_delivers_with_configured_sender() {
        assert!(!AppConfig::get().email.from_address.is_empty());
        let result = LogMailer
            .send_notification_email("priya@campus.edu", "Exam hall change", "Room moved.", "Priya")
            .await;
        assert!(result.is_ok());
    }
}
