//! Compose-modal channel for pandalive.co.kr.
//!
//! Everything here is tied to one site's markup and copy; the rest of the
//! engine only sees the [`DeliveryChannel`] trait. Flow: log in on the
//! received-messages page, open the compose modal, then per recipient fill
//! the id and body, send, confirm, read whatever dialog/toast text appears,
//! and dismiss it so the modal is ready for the next submission.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep};

use super::webdriver::{KEY_ENTER, WebDriver, WebDriverConfig};
use super::{ChannelError, DeliveryChannel};

const LOGIN_URL: &str = "https://www.pandalive.co.kr/my/post/received";

// Site markup. All page coupling lives in this block.
const XP_LOGIN_TAB: &str = "//button[@role='tab']//p[normalize-space()='로그인']";
const XP_ID_INPUT: &str = "//*[@id='id' or @name='id']";
const XP_PW_INPUT: &str = "//input[@name='pw']";
const XP_COMPOSE_BUTTON: &str = "//button[normalize-space()='쪽지쓰기']";
const XP_RECIPIENT_INPUT: &str = "//input[@placeholder='받는회원 ID']";
const XP_MESSAGE_BOX: &str = "//textarea[@placeholder='쪽지내용을 입력하세요.']";
const XP_SEND_BUTTON: &str = "//button[normalize-space()='보내기']";
const XP_OK_BUTTON: &str = "//button[normalize-space()='확인']";
const XP_DIALOG_OK_BUTTON: &str = "//div[@role='dialog']//button[normalize-space()='확인']";
const XP_FEEDBACK_CONTAINERS: &[&str] = &[
    "//div[@role='dialog']",
    "//*[contains(@class,'modal') or contains(@class,'dialog') \
     or contains(@class,'Toastify__toast') or contains(@class,'toast')]",
];

/// Window to watch for feedback dialogs/toasts after a send.
const FEEDBACK_WINDOW: Duration = Duration::from_secs(1);

/// Login credentials for the destination service.
#[derive(Clone)]
pub struct Credentials {
    pub id: String,
    pub secret: String,
}

// The secret must never reach logs or error chains.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Browser-backed delivery channel for the PandaLive compose modal.
pub struct PandaChannel {
    driver: WebDriver,
    credentials: Credentials,
    opened: bool,
}

impl PandaChannel {
    pub fn new(config: WebDriverConfig, credentials: Credentials) -> Result<Self, ChannelError> {
        Ok(Self {
            driver: WebDriver::new(config)?,
            credentials,
            opened: false,
        })
    }

    /// Log in and leave the compose modal open.
    async fn login_and_open_compose(&mut self) -> Result<(), ChannelError> {
        self.driver.start_session().await?;
        self.driver.goto(LOGIN_URL).await?;

        // The signup tab may be the default; switching is best-effort
        self.driver
            .wait_click(XP_LOGIN_TAB, Duration::from_secs(3))
            .await;

        let id_box = self
            .driver
            .wait_for(XP_ID_INPUT, Duration::from_secs(5))
            .await
            .map_err(|_| ChannelError::SurfaceNotFound("login id input".to_string()))?;
        self.driver.clear(&id_box).await?;
        self.driver.send_keys(&id_box, &self.credentials.id).await?;

        let pw_box = self
            .driver
            .wait_for(XP_PW_INPUT, Duration::from_secs(4))
            .await
            .map_err(|_| ChannelError::SurfaceNotFound("login password input".to_string()))?;
        self.driver.clear(&pw_box).await?;
        self.driver.send_keys(&pw_box, &self.credentials.secret).await?;
        self.driver
            .send_keys(&pw_box, &KEY_ENTER.to_string())
            .await?;

        // The compose button appearing is the login-complete signal
        self.driver
            .wait_for(XP_COMPOSE_BUTTON, Duration::from_secs(10))
            .await
            .map_err(|_| {
                ChannelError::Session("login did not complete (compose button never appeared)".to_string())
            })?;

        // Post-login notices (password change prompts etc.)
        self.dismiss_ok_dialogs(3).await;

        self.driver
            .wait_click(XP_COMPOSE_BUTTON, Duration::from_secs(3))
            .await;
        self.wait_for_compose(Duration::from_secs(8)).await?;

        log::info!("compose surface ready for {}", self.credentials.id);
        Ok(())
    }

    /// Re-open the compose modal if the last dialog closed it.
    async fn ensure_compose_open(&mut self) -> Result<(), ChannelError> {
        let id_present = self.driver.try_find(XP_RECIPIENT_INPUT).await?.is_some();
        let msg_present = self.driver.try_find(XP_MESSAGE_BOX).await?.is_some();
        if id_present && msg_present {
            return Ok(());
        }

        self.driver
            .wait_click(XP_COMPOSE_BUTTON, Duration::from_secs(2))
            .await;
        self.wait_for_compose(Duration::from_secs(4)).await
    }

    async fn wait_for_compose(&mut self, timeout: Duration) -> Result<(), ChannelError> {
        self.driver
            .wait_for(XP_RECIPIENT_INPUT, timeout)
            .await
            .map_err(|_| ChannelError::SurfaceNotFound("recipient input".to_string()))?;
        self.driver
            .wait_for(XP_MESSAGE_BOX, timeout)
            .await
            .map_err(|_| ChannelError::SurfaceNotFound("message box".to_string()))?;
        Ok(())
    }

    /// Close generic acknowledgement dialogs, up to `tries` of them.
    async fn dismiss_ok_dialogs(&mut self, tries: usize) {
        for _ in 0..tries {
            let clicked = self
                .driver
                .wait_click(XP_OK_BUTTON, Duration::from_secs(1))
                .await
                || self
                    .driver
                    .wait_click(XP_DIALOG_OK_BUTTON, Duration::from_secs(1))
                    .await;
            if !clicked {
                break;
            }
            sleep(Duration::from_millis(200)).await;
        }
    }

    /// Collect visible text from dialogs/toasts within the feedback window.
    async fn collect_feedback(&mut self) -> Vec<String> {
        let deadline = Instant::now() + FEEDBACK_WINDOW;
        let mut texts = Vec::new();

        loop {
            for xpath in XP_FEEDBACK_CONTAINERS {
                if let Ok(elements) = self.driver.find_all(xpath).await {
                    for element in &elements {
                        if let Ok(text) = self.driver.text(element).await {
                            let trimmed = text.trim();
                            if !trimmed.is_empty() {
                                texts.push(trimmed.to_string());
                            }
                        }
                    }
                }
            }
            if !texts.is_empty() || Instant::now() >= deadline {
                break;
            }
            sleep(Duration::from_millis(100)).await;
        }

        texts
    }
}

#[async_trait]
impl DeliveryChannel for PandaChannel {
    async fn open(&mut self) -> Result<(), ChannelError> {
        if self.opened && self.driver.has_session() {
            // Session is live; just make sure the modal is up
            return self.ensure_compose_open().await;
        }
        self.login_and_open_compose().await?;
        self.opened = true;
        Ok(())
    }

    async fn submit(
        &mut self,
        recipient_id: &str,
        message: &str,
    ) -> Result<Vec<String>, ChannelError> {
        self.ensure_compose_open().await?;

        let to_box = self
            .driver
            .wait_for(XP_RECIPIENT_INPUT, Duration::from_millis(1_500))
            .await
            .map_err(|_| ChannelError::SurfaceNotFound("recipient input".to_string()))?;
        self.driver.clear(&to_box).await?;
        self.driver.send_keys(&to_box, recipient_id).await?;

        let msg_box = self
            .driver
            .wait_for(XP_MESSAGE_BOX, Duration::from_millis(1_200))
            .await
            .map_err(|_| ChannelError::SurfaceNotFound("message box".to_string()))?;
        self.driver.clear(&msg_box).await?;
        self.driver.send_keys(&msg_box, message).await?;

        if !self
            .driver
            .wait_click(XP_SEND_BUTTON, Duration::from_millis(1_500))
            .await
        {
            // The modal may have collapsed under us; one re-open retry
            self.ensure_compose_open().await?;
            if !self
                .driver
                .wait_click(XP_SEND_BUTTON, Duration::from_millis(1_500))
                .await
            {
                return Err(ChannelError::NotInteractable("send button".to_string()));
            }
        }

        // "send this message?" confirmation
        self.driver
            .wait_click(XP_OK_BUTTON, Duration::from_millis(1_500))
            .await;

        // Give the notice a moment to render
        sleep(Duration::from_millis(300)).await;
        let texts = self.collect_feedback().await;

        // Clear any remaining acknowledgement so the next submit starts clean
        self.dismiss_ok_dialogs(2).await;
        if let Err(e) = self.ensure_compose_open().await {
            log::warn!("compose modal not restored after submit: {}", e);
        }

        Ok(texts)
    }

    async fn close(&mut self) {
        self.driver.quit().await;
        self.opened = false;
    }
}
