/// 测试用的本地 HTTP 服务器（模拟 Google 端点）
use std::io::Read;
use std::sync::{Arc, Mutex};

use tiny_http::{Header, Response, Server};

/// 记录下来的请求
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub body: String,
    pub authorization: Option<String>,
}

/// 模拟响应
pub struct FakeResponse {
    status: u16,
    body: String,
}

impl FakeResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

/// 本地模拟服务器，线程随测试进程退出
pub struct TestServer {
    base: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> FakeResponse + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0").expect("启动测试服务器失败");
        let port = server.server_addr().to_ip().expect("测试服务器地址").port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        std::thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let mut body = String::new();
                request.as_reader().read_to_string(&mut body).ok();

                let authorization = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_string());

                let entry = RecordedRequest {
                    method: request.method().as_str().to_string(),
                    url: request.url().to_string(),
                    body,
                    authorization,
                };
                recorded.lock().unwrap().push(entry.clone());

                let fake = handler(&entry);
                let mut response = Response::from_string(fake.body).with_status_code(fake.status);
                response.add_header(
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap(),
                );
                request.respond(response).ok();
            }
        });

        Self {
            base: format!("http://127.0.0.1:{}", port),
            requests,
        }
    }

    /// 服务器根地址
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}
