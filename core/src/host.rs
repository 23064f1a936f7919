//! Presentation host capability
//!
//! The service never drives slides itself. The application embedding it
//! implements [`PresentationHost`] and the service calls back into it when
//! the paired remote issues a command.

use crate::protocol::{ClientRequest, ServerMessage};
use crate::session::SessionWriter;
use crate::Result;

/// Slide show operations provided by the host application.
///
/// Methods are called from the service's event task and should return
/// promptly; `Ok(None)` from the content getters means there is nothing to
/// send, e.g. no slide show is running.
pub trait PresentationHost: Send + Sync {
    fn start_slide_show(&self) -> Result<()>;

    fn stop_slide_show(&self) -> Result<()>;

    fn next_slide(&self) -> Result<()>;

    fn previous_slide(&self) -> Result<()>;

    /// Notes text of the current slide
    fn slide_notes(&self) -> Result<Option<String>>;

    /// Current slide exported as an encoded image
    fn slide_image(&self) -> Result<Option<Vec<u8>>>;
}

/// Apply a remote's command to the host, then bring the remote up to date:
/// the new slide's notes and image after navigation, `Stop` after the show
/// was ended.
pub async fn apply_request(
    host: &dyn PresentationHost,
    request: ClientRequest,
    writer: &SessionWriter,
) -> Result<()> {
    match request {
        ClientRequest::StartPresentation => host.start_slide_show()?,
        ClientRequest::NextSlide => host.next_slide()?,
        ClientRequest::PreviousSlide => host.previous_slide()?,
        ClientRequest::StopPresentation => {
            host.stop_slide_show()?;
            return writer.send_authenticated(&ServerMessage::Stop).await;
        }
    }

    push_current_slide(host, writer).await
}

/// Send the current slide's notes, then its image
pub async fn push_current_slide(host: &dyn PresentationHost, writer: &SessionWriter) -> Result<()> {
    if let Some(notes) = host.slide_notes()? {
        writer.send_authenticated(&ServerMessage::notes(&notes)).await?;
    }
    if let Some(image) = host.slide_image()? {
        writer.send_authenticated(&ServerMessage::Image(image)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_test::io::Builder;

    /// Host double that records calls and serves fixed content
    #[derive(Default)]
    struct RecordingHost {
        pub calls: Mutex<Vec<&'static str>>,
        pub notes: Option<String>,
        pub image: Option<Vec<u8>>,
        pub fail_navigation: bool,
    }

    impl RecordingHost {
        fn record(&self, call: &'static str) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.fail_navigation {
                return Err(Error::Host(format!("{} failed", call)));
            }
            Ok(())
        }
    }

    impl PresentationHost for RecordingHost {
        fn start_slide_show(&self) -> Result<()> {
            self.record("start")
        }

        fn stop_slide_show(&self) -> Result<()> {
            self.record("stop")
        }

        fn next_slide(&self) -> Result<()> {
            self.record("next")
        }

        fn previous_slide(&self) -> Result<()> {
            self.record("previous")
        }

        fn slide_notes(&self) -> Result<Option<String>> {
            Ok(self.notes.clone())
        }

        fn slide_image(&self) -> Result<Option<Vec<u8>>> {
            Ok(self.image.clone())
        }
    }

    async fn paired_writer(expected: &[u8]) -> SessionWriter {
        let writer = SessionWriter::new(Duration::from_secs(1));
        writer.attach(Builder::new().write(expected).build()).await;
        writer.mark_authenticated().await;
        writer
    }

    #[tokio::test]
    async fn test_next_slide_pushes_notes_then_image() {
        let host = RecordingHost {
            notes: Some("Line 1\rLine 2".to_string()),
            image: Some(vec![9, 9]),
            ..Default::default()
        };

        let mut expected = ServerMessage::notes("Line 1\nLine 2").encode().unwrap();
        expected.extend(ServerMessage::Image(vec![9, 9]).encode().unwrap());
        let writer = paired_writer(&expected).await;

        apply_request(&host, ClientRequest::NextSlide, &writer).await.unwrap();
        assert_eq!(*host.calls.lock().unwrap(), vec!["next"]);
    }

    #[tokio::test]
    async fn test_stop_sends_stop_only() {
        let host = RecordingHost {
            notes: Some("ignored".to_string()),
            ..Default::default()
        };
        let writer = paired_writer(&[2]).await;

        apply_request(&host, ClientRequest::StopPresentation, &writer)
            .await
            .unwrap();
        assert_eq!(*host.calls.lock().unwrap(), vec!["stop"]);
    }

    #[tokio::test]
    async fn test_nothing_sent_without_content() {
        let host = RecordingHost::default();
        let writer = paired_writer(&[]).await;

        apply_request(&host, ClientRequest::PreviousSlide, &writer)
            .await
            .unwrap();
        apply_request(&host, ClientRequest::StartPresentation, &writer)
            .await
            .unwrap();
        assert_eq!(*host.calls.lock().unwrap(), vec!["previous", "start"]);
    }

    #[tokio::test]
    async fn test_host_failure_stops_push() {
        let host = RecordingHost {
            notes: Some("never sent".to_string()),
            fail_navigation: true,
            ..Default::default()
        };
        let writer = paired_writer(&[]).await;

        let result = apply_request(&host, ClientRequest::NextSlide, &writer).await;
        assert!(matches!(result, Err(Error::Host(_))));
    }
}
