//! 邮件通知模块
//!
//! 注册、封禁、解封等事件发生时向管理员本人发送邮件。
//! 使用 mpsc channel 解耦请求处理与 SMTP 发送，发送失败只记录日志。

use anyhow::Context;
use askama::Template;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::mpsc;

use crate::model::config::EmailConfig;

/// 邮件模板
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
    /// 邮箱验证
    Verification,
    /// 欢迎邮件（不要求验证时发送）
    Welcome,
    /// 账号被封禁
    Block,
    /// 账号被解封
    Unblock,
}

impl EmailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            EmailTemplate::Verification => "verification",
            EmailTemplate::Welcome => "welcome",
            EmailTemplate::Block => "block",
            EmailTemplate::Unblock => "unblock",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            EmailTemplate::Verification => "Verify your email address",
            EmailTemplate::Welcome => "Welcome",
            EmailTemplate::Block => "Your account has been blocked",
            EmailTemplate::Unblock => "Your account has been unblocked",
        }
    }
}

#[derive(Template)]
#[template(source = "[{{ site_name }}] {{ title }}", ext = "txt")]
struct EmailSubject<'a> {
    site_name: &'a str,
    title: &'a str,
}

#[derive(Template)]
#[template(path = "email/verification.txt")]
struct VerificationEmailText<'a> {
    name: &'a str,
    site_name: &'a str,
    code: &'a str,
    verify_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    name: &'a str,
    site_name: &'a str,
}

#[derive(Template)]
#[template(path = "email/block.txt")]
struct BlockEmailText<'a> {
    name: &'a str,
    site_name: &'a str,
}

#[derive(Template)]
#[template(path = "email/unblock.txt")]
struct UnblockEmailText<'a> {
    name: &'a str,
    site_name: &'a str,
}

/// 验证邮件中的验证码和验证链接
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationLink {
    pub code: String,
    pub url: String,
}

/// 一条待发送的邮件通知
#[derive(Debug, Clone)]
pub struct Notification {
    pub to: String,
    pub template: EmailTemplate,
    /// 收件管理员的名字
    pub name: String,
    pub site_name: String,
    /// 仅 `EmailTemplate::Verification` 使用
    pub verification: Option<VerificationLink>,
}

impl Notification {
    pub fn new(
        to: impl Into<String>,
        template: EmailTemplate,
        name: impl Into<String>,
        site_name: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            template,
            name: name.into(),
            site_name: site_name.into(),
            verification: None,
        }
    }

    pub fn with_verification(mut self, code: impl Into<String>, url: impl Into<String>) -> Self {
        self.verification = Some(VerificationLink {
            code: code.into(),
            url: url.into(),
        });
        self
    }

    /// 渲染邮件标题和正文
    pub fn render(&self) -> Result<(String, String), askama::Error> {
        let name = self.name.as_str();
        let site_name = self.site_name.as_str();

        let body = match self.template {
            EmailTemplate::Verification => {
                let link = self.verification.as_ref();
                VerificationEmailText {
                    name,
                    site_name,
                    code: link.map_or("", |l| l.code.as_str()),
                    verify_url: link.map_or("", |l| l.url.as_str()),
                }
                .render()?
            }
            EmailTemplate::Welcome => WelcomeEmailText { name, site_name }.render()?,
            EmailTemplate::Block => BlockEmailText { name, site_name }.render()?,
            EmailTemplate::Unblock => UnblockEmailText { name, site_name }.render()?,
        };
        let subject = EmailSubject {
            site_name,
            title: self.template.title(),
        }
        .render()?;

        Ok((subject, body))
    }
}

/// 通知通道（fire-and-forget）
pub trait Notifier: Send + Sync {
    /// 投递通知，不等待发送结果，失败只记录日志
    fn send(&self, notification: Notification);
}

/// SMTP 邮件通知器
///
/// 通过有界 channel（容量 64）把通知交给后台任务发送，防止 SMTP 故障时无限堆积。
pub struct EmailNotifier {
    sender: mpsc::Sender<Notification>,
}

impl EmailNotifier {
    /// 创建新的邮件通知器，启动后台消费任务
    pub fn new(config: EmailConfig) -> anyhow::Result<Self> {
        let mailer = Self::build_transport(&config)?;
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(Self::consume_loop(config, mailer, rx));
        Ok(Self { sender: tx })
    }

    /// 后台消费循环
    async fn consume_loop(
        config: EmailConfig,
        mailer: AsyncSmtpTransport<Tokio1Executor>,
        mut rx: mpsc::Receiver<Notification>,
    ) {
        while let Some(notification) = rx.recv().await {
            if let Err(e) = Self::send_raw(&config, &mailer, &notification).await {
                tracing::warn!(
                    template = notification.template.name(),
                    to = %notification.to,
                    "发送通知邮件失败: {:#}",
                    e
                );
            }
        }
        tracing::debug!("邮件通知消费循环已退出");
    }

    /// 底层邮件发送
    async fn send_raw(
        config: &EmailConfig,
        mailer: &AsyncSmtpTransport<Tokio1Executor>,
        notification: &Notification,
    ) -> anyhow::Result<()> {
        let (subject, body) = notification.render().context("渲染邮件模板失败")?;

        let email = Message::builder()
            .from(config.from_address.parse().context("发件人地址格式无效")?)
            .to(notification
                .to
                .parse()
                .with_context(|| format!("收件人地址格式无效: {}", notification.to))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("构建邮件失败")?;

        mailer
            .send(email)
            .await
            .with_context(|| format!("发送邮件到 {} 失败", notification.to))?;

        tracing::info!(
            template = notification.template.name(),
            to = %notification.to,
            "通知邮件已发送"
        );
        Ok(())
    }

    /// 构建 SMTP 传输
    fn build_transport(config: &EmailConfig) -> anyhow::Result<AsyncSmtpTransport<Tokio1Executor>> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let builder = if config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .context("创建 STARTTLS SMTP 传输失败")?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        Ok(builder.port(config.smtp_port).credentials(creds).build())
    }
}

impl Notifier for EmailNotifier {
    fn send(&self, notification: Notification) {
        if let Err(e) = self.sender.try_send(notification) {
            tracing::warn!("投递邮件通知失败（channel 已满或已关闭）: {}", e);
        }
    }
}

/// 未配置邮件时使用：只记录日志
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, notification: Notification) {
        tracing::info!(
            template = notification.template.name(),
            to = %notification.to,
            "邮件通知未配置，跳过发送"
        );
    }
}
