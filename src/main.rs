//! Lucky Draw entry point
//!
//! Native: serves the participant/spin HTTP API.
//! Web: runs the wheel in the page's `#wheel` canvas.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{
        Document, HtmlCanvasElement, HtmlInputElement, HtmlTextAreaElement, Request, RequestInit,
        Response,
    };

    use lucky_draw::api::SpinResponse;
    use lucky_draw::history::format_age;
    use lucky_draw::persistence::{LocalStore, MemoryStore, Store};
    use lucky_draw::platform::WebSurface;
    use lucky_draw::{LuckyDraw, Settings};

    struct Host {
        app: LuckyDraw<WebSurface>,
        /// A frame callback is scheduled
        running: bool,
        /// A spin request is in flight
        requesting: bool,
        /// Last rejected action, shown under the wheel
        notice: Option<String>,
    }

    impl Host {
        fn update_ui(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };

            if let Some(el) = document.get_element_by_id("participant-count") {
                el.set_text_content(Some(&self.app.roster().len().to_string()));
            }
            if let Some(el) = document.get_element_by_id("spin-btn") {
                if self.requesting || self.app.is_spinning() || self.app.roster().len() < 2 {
                    let _ = el.set_attribute("disabled", "");
                } else {
                    let _ = el.remove_attribute("disabled");
                }
            }
            if let Some(el) = document.get_element_by_id("winner") {
                match self.app.last_winner() {
                    Some(p) => el.set_text_content(Some(&p.name)),
                    None => el.set_text_content(Some("")),
                }
            }
            if let Some(el) = document.get_element_by_id("notice") {
                el.set_text_content(self.notice.as_deref());
            }
            self.update_lists(&document);
        }

        fn update_lists(&self, document: &Document) {
            if let Some(list) = document.get_element_by_id("participants") {
                list.set_text_content(None);
                for p in self.app.roster().participants() {
                    if let Ok(li) = document.create_element("li") {
                        li.set_text_content(Some(&p.name));
                        let _ = li.set_attribute("style", &format!("border-left: 6px solid {}", p.color));
                        let _ = list.append_child(&li);
                    }
                }
            }
            if let Some(list) = document.get_element_by_id("history") {
                list.set_text_content(None);
                let now = js_sys::Date::now();
                for entry in &self.app.history().entries {
                    if let Ok(li) = document.create_element("li") {
                        li.set_text_content(Some(&format!(
                            "{} ({})",
                            entry.name,
                            format_age(entry.timestamp, now)
                        )));
                        let _ = list.append_child(&li);
                    }
                }
            }
        }
    }

    fn now() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }

    fn open_store() -> Box<dyn Store> {
        match LocalStore::open() {
            Ok(store) => Box::new(store),
            Err(e) => {
                log::warn!("{} - nothing will be saved", e);
                Box::new(MemoryStore::default())
            }
        }
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Lucky Draw starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let store = open_store();
        let settings = Settings::load_from(store.as_ref());

        let surface = document
            .get_element_by_id("wheel")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
            .and_then(|canvas| {
                WebSurface::new(&canvas, settings.view_size, window.device_pixel_ratio())
                    .map_err(|e| log::warn!("Canvas unavailable: {}", e))
                    .ok()
            });

        if let Some(input) = document
            .get_element_by_id("duration")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            input.set_value(&(settings.spin_duration_ms / 1000.0).to_string());
        }

        let host = Rc::new(RefCell::new(Host {
            app: LuckyDraw::new(settings, store, surface),
            running: false,
            requesting: false,
            notice: None,
        }));

        setup_spin_button(&document, host.clone());
        setup_add_form(&document, host.clone());
        setup_roster_buttons(&document, host.clone());
        setup_duration(&document, host.clone());
        setup_pagehide(&window, host.clone());

        host.borrow().update_ui();
        log::info!("Lucky Draw running!");
        Ok(())
    }

    fn on_click(document: &Document, id: &str, host: Rc<RefCell<Host>>, action: fn(&mut Host)) {
        let Some(btn) = document.get_element_by_id(id) else {
            log::warn!("Missing #{}", id);
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
            let mut h = host.borrow_mut();
            action(&mut h);
            h.update_ui();
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Keep an error as the on-screen notice
    fn report<T>(host: &mut Host, result: Result<T, lucky_draw::DrawError>) {
        host.notice = result.err().map(|e| {
            log::info!("{}", e);
            e.to_string()
        });
    }

    fn setup_spin_button(document: &Document, host: Rc<RefCell<Host>>) {
        let Some(btn) = document.get_element_by_id("spin-btn") else {
            log::warn!("Missing #spin-btn");
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
            let request = {
                let mut h = host.borrow_mut();
                if h.requesting || h.app.is_spinning() {
                    return;
                }
                let endpoint = h.app.settings().spin_endpoint.clone();
                if endpoint.is_empty() {
                    None
                } else {
                    h.requesting = true;
                    h.update_ui();
                    Some((endpoint, h.app.spin_request().to_string()))
                }
            };
            let Some((endpoint, body)) = request else {
                start_spin(&host, None);
                return;
            };
            let host = host.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let response = match fetch_spin(&endpoint, &body).await {
                    Ok(response) => Some(response),
                    Err(e) => {
                        log::warn!("Spin request failed ({}), drawing locally", e);
                        None
                    }
                };
                host.borrow_mut().requesting = false;
                start_spin(&host, response.as_ref());
            });
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Start the wheel on the server's draw, or a local one without it
    fn start_spin(host: &Rc<RefCell<Host>>, server: Option<&SpinResponse>) {
        let start = {
            let mut h = host.borrow_mut();
            let result = h.app.spin_from(server, now());
            let started = result.is_ok();
            report(&mut h, result);
            h.update_ui();
            started && !std::mem::replace(&mut h.running, true)
        };
        if start {
            request_animation_frame(host.clone());
        }
    }

    async fn fetch_spin(endpoint: &str, body: &str) -> Result<SpinResponse, String> {
        let window = web_sys::window().ok_or("no window")?;
        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_body(&JsValue::from_str(body));
        let request = Request::new_with_str_and_init(endpoint, &opts).map_err(|e| format!("{:?}", e))?;
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(|e| format!("{:?}", e))?;

        let value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| format!("{:?}", e))?;
        let response: Response = value.dyn_into().map_err(|_| "not a Response")?;
        if !response.ok() {
            return Err(format!("HTTP {}", response.status()));
        }
        let text = JsFuture::from(response.text().map_err(|e| format!("{:?}", e))?)
            .await
            .map_err(|e| format!("{:?}", e))?;
        let text = text.as_string().ok_or("body is not text")?;
        serde_json::from_str(&text).map_err(|e| e.to_string())
    }

    fn setup_add_form(document: &Document, host: Rc<RefCell<Host>>) {
        on_click(document, "add-btn", host, |h| {
            let Some(input) = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.get_element_by_id("names"))
                .and_then(|el| el.dyn_into::<HtmlTextAreaElement>().ok())
            else {
                return;
            };
            let result = h.app.add_bulk(&input.value());
            if result.is_ok() {
                input.set_value("");
            }
            report(h, result);
        });
    }

    fn setup_roster_buttons(document: &Document, host: Rc<RefCell<Host>>) {
        on_click(document, "shuffle-btn", host.clone(), |h| {
            let result = h.app.shuffle();
            report(h, result);
        });
        on_click(document, "clear-btn", host.clone(), |h| {
            let result = h.app.clear();
            report(h, result);
        });
        on_click(document, "remove-winner-btn", host.clone(), |h| {
            let result = h.app.remove_winner();
            report(h, result);
        });
        on_click(document, "clear-history-btn", host, |h| {
            h.app.clear_history();
            h.notice = None;
        });
    }

    fn setup_duration(document: &Document, host: Rc<RefCell<Host>>) {
        let Some(input) = document
            .get_element_by_id("duration")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        else {
            return;
        };
        let target = input.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if let Ok(seconds) = target.value().parse::<f64>() {
                host.borrow_mut().app.set_spin_seconds(seconds);
            }
        });
        let _ = input.add_event_listener_with_callback("input", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Leaving the page mid-spin drops the spin without announcing it
    fn setup_pagehide(window: &web_sys::Window, host: Rc<RefCell<Host>>) {
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if let Ok(mut h) = host.try_borrow_mut() {
                h.app.cancel();
            }
        });
        let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(host: Rc<RefCell<Host>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            frame_loop(host, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn frame_loop(host: Rc<RefCell<Host>>, time: f64) {
        let keep_running = {
            let mut h = host.borrow_mut();
            let step = h.app.frame(time);
            if step.ticks > 0 {
                log::trace!("tick x{}", step.ticks);
            }
            if step.stopped || step.announce.is_some() {
                h.update_ui();
            }
            h.running = step.keep_running;
            step.keep_running
        };

        if keep_running {
            request_animation_frame(host);
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_app::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use lucky_draw::Settings;
    use lucky_draw::api::ApiState;
    use lucky_draw::persistence::FileStore;

    env_logger::init();
    log::info!("Lucky Draw (native) starting...");

    let settings = Settings::load();
    let store = match FileStore::open(&settings.data_dir) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Cannot open data directory {}: {}", settings.data_dir, e);
            std::process::exit(1);
        }
    };

    let addr = settings.bind_addr.clone();
    let state = ApiState::new(settings, Box::new(store));
    if let Err(e) = lucky_draw::server::run(&addr, state) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main
}
