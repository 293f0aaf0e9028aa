// Android picker backend
//
// Talks to the host app's MainActivity over JNI. The activity launches the
// system intents and stores the result in static fields, which we poll.
//
// Activity contract (instance methods unless noted):
//   launchCamera(String target, boolean front)
//   launchImagePicker(), launchImagePickerMulti(), launchVideoPicker()
//   launchVideoCamera(String target, boolean front, int quality, int maxSeconds, long maxBytes)
//   dismissPicker()
//   saveToAlbum(String path, boolean video) -> String
//   static clearLastError(), getLastError() -> String, wasDismissed() -> boolean
//   static getLastPhotoPath(), getLastPhotoPaths() (newline separated), getLastVideoPath()

use jni::objects::{JClass, JObject, JString, JValue};
use jni::JNIEnv;
use ndk_context::android_context;
use photo_finisher::DeviceInfo;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::{Capabilities, CaptureRequest, PickerBackend, PickerOutcome, VideoRequest};
use crate::config::AndroidPickerConfig;
use crate::error::MediaError;
use crate::options::{CameraDevice, MediaKind, VideoQuality};

fn jni_err(context: &'static str) -> impl Fn(jni::errors::Error) -> MediaError {
    move |e| MediaError::Platform(format!("{}: {}", context, e))
}

fn clear_exception(env: &mut JNIEnv) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_clear();
    }
}

fn classify_activity_error(message: String) -> MediaError {
    if message.to_lowercase().contains("permission") {
        MediaError::PermissionDenied(message)
    } else {
        MediaError::Platform(message)
    }
}

fn get_app_class_loader<'a>(env: &mut JNIEnv<'a>) -> Result<JObject<'a>, MediaError> {
    // ActivityThread.currentActivityThread()
    let at_cls = env
        .find_class("android/app/ActivityThread")
        .map_err(jni_err("ActivityThread not found"))?;
    let at = env
        .call_static_method(
            &at_cls,
            "currentActivityThread",
            "()Landroid/app/ActivityThread;",
            &[],
        )
        .and_then(|v| v.l())
        .map_err(jni_err("currentActivityThread failed"))?;

    // Prefer application class loader, fall back to the system context
    let app = env
        .call_method(&at, "getApplication", "()Landroid/app/Application;", &[])
        .and_then(|v| v.l())
        .map_err(jni_err("getApplication failed"))?;
    let context = if app.is_null() {
        env.call_method(&at, "getSystemContext", "()Landroid/app/ContextImpl;", &[])
            .and_then(|v| v.l())
            .map_err(jni_err("getSystemContext failed"))?
    } else {
        app
    };

    env.call_method(&context, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
        .and_then(|v| v.l())
        .map_err(jni_err("getClassLoader failed"))
}

fn load_class<'a>(
    env: &mut JNIEnv<'a>,
    loader: &JObject<'a>,
    fq_slash: &str,
) -> Result<JClass<'a>, MediaError> {
    // dev/dioxus/main/MainActivity -> dev.dioxus.main.MainActivity for ClassLoader.loadClass
    let name: JString = env
        .new_string(fq_slash.replace('/', "."))
        .map_err(jni_err("new_string failed"))?;
    let cls_obj = env
        .call_method(
            loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&JObject::from(name))],
        )
        .and_then(|v| v.l())
        .map_err(jni_err("ClassLoader.loadClass failed"))?;
    Ok(JClass::from(cls_obj))
}

fn companion_instance<'a>(
    env: &mut JNIEnv<'a>,
    cls: &JClass<'a>,
    config: &AndroidPickerConfig,
    signature: &str,
) -> Result<JObject<'a>, MediaError> {
    let comp_signature = format!("L{}$Companion;", config.main_activity_class);
    let companion = env
        .get_static_field(cls, "Companion", &comp_signature)
        .and_then(|v| v.l())
        .map_err(jni_err("Failed to get Companion field"))?;
    if companion.is_null() {
        return Err(MediaError::Platform(
            "MainActivity.Companion is null, activity not initialized?".to_string(),
        ));
    }
    env.call_method(&companion, "getInstance", signature, &[])
        .and_then(|v| v.l())
        .map_err(jni_err("Companion.getInstance() failed"))
}

fn get_activity_instance<'a>(
    env: &mut JNIEnv<'a>,
    config: &AndroidPickerConfig,
) -> Result<(JObject<'a>, JClass<'a>), MediaError> {
    let loader = get_app_class_loader(env)?;
    let cls = load_class(env, &loader, &config.main_activity_class)?;
    let signature = format!("()L{};", config.main_activity_class);

    // `@JvmStatic getInstance()`, then a static `instance` field, then the
    // Kotlin companion object
    let instance = match env
        .call_static_method(&cls, "getInstance", &signature, &[])
        .and_then(|v| v.l())
    {
        Ok(instance) => instance,
        Err(_) => {
            clear_exception(env);
            let field_sig = format!("L{};", config.main_activity_class);
            match env
                .get_static_field(&cls, "instance", &field_sig)
                .and_then(|v| v.l())
            {
                Ok(instance) if !instance.is_null() => instance,
                _ => {
                    clear_exception(env);
                    companion_instance(env, &cls, config, &signature)?
                }
            }
        }
    };

    if instance.is_null() {
        return Err(MediaError::Platform(
            "MainActivity instance is null - Activity not initialized?".to_string(),
        ));
    }

    Ok((instance, cls))
}

fn static_string(
    env: &mut JNIEnv,
    class: &JClass,
    method: &str,
) -> Result<Option<String>, MediaError> {
    let obj = match env
        .call_static_method(class, method, "()Ljava/lang/String;", &[])
        .and_then(|v| v.l())
    {
        Ok(obj) => obj,
        Err(e) => {
            clear_exception(env);
            log::trace!("{} not answered: {}", method, e);
            return Ok(None);
        }
    };
    if obj.is_null() {
        return Ok(None);
    }
    let value: String = env
        .get_string(&JString::from(obj))
        .map_err(jni_err("String conversion failed"))?
        .into();
    Ok(Some(value))
}

fn static_flag(env: &mut JNIEnv, class: &JClass, method: &str) -> bool {
    match env
        .call_static_method(class, method, "()Z", &[])
        .and_then(|v| v.z())
    {
        Ok(flag) => flag,
        Err(_) => {
            clear_exception(env);
            false
        }
    }
}

fn static_field_string(env: &mut JNIEnv, class: &str, field: &str) -> Option<String> {
    let cls = env.find_class(class).ok()?;
    let obj = env
        .get_static_field(&cls, field, "Ljava/lang/String;")
        .and_then(|v| v.l())
        .ok()?;
    if obj.is_null() {
        return None;
    }
    env.get_string(&JString::from(obj)).ok().map(Into::into)
}

fn path_arg<'a>(env: &mut JNIEnv<'a>, path: &Path) -> Result<JObject<'a>, MediaError> {
    let jpath = env
        .new_string(path.to_string_lossy())
        .map_err(jni_err("new_string failed"))?;
    Ok(JObject::from(jpath))
}

fn front_flag(camera: CameraDevice) -> u8 {
    u8::from(camera == CameraDevice::Front)
}

/// `PickerBackend` bridging to the host activity over JNI
#[derive(Debug, Clone)]
pub struct AndroidBackend {
    config: AndroidPickerConfig,
}

impl AndroidBackend {
    pub fn new(config: AndroidPickerConfig) -> Self {
        Self { config }
    }

    fn with_env<T>(
        &self,
        f: impl for<'local> FnOnce(&mut JNIEnv<'local>) -> Result<T, MediaError>,
    ) -> Result<T, MediaError> {
        let vm_ptr = android_context().vm() as *mut *const jni::sys::JNIInvokeInterface_;
        let vm = unsafe { jni::JavaVM::from_raw(vm_ptr) }.map_err(jni_err("JavaVM failed"))?;
        let mut env = vm
            .attach_current_thread()
            .map_err(jni_err("JNI attach failed"))?;
        f(&mut env)
    }

    /// Clears the last error, runs `launch` against the activity and polls
    /// `result_getter` until the UI answers, is dismissed, canceled or times out.
    fn launch_and_wait(
        &self,
        what: &str,
        result_getter: &str,
        cancel: &CancellationToken,
        launch: impl for<'local> FnOnce(&mut JNIEnv<'local>, &JObject<'local>) -> Result<(), MediaError>,
    ) -> Result<PickerOutcome<String>, MediaError> {
        self.with_env(|env| {
            let (activity, main_cls) = get_activity_instance(env, &self.config)?;

            env.call_static_method(&main_cls, "clearLastError", "()V", &[])
                .map_err(jni_err("clearLastError failed"))?;
            launch(env, &activity)?;
            log::debug!("{} launched", what);

            let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
            let deadline = Instant::now() + Duration::from_secs(self.config.response_timeout_secs);

            loop {
                if cancel.is_cancelled() {
                    log::info!("{} canceled, dismissing", what);
                    if let Err(e) = env.call_method(&activity, "dismissPicker", "()V", &[]) {
                        clear_exception(env);
                        log::warn!("dismissPicker failed: {}", e);
                    }
                    return Ok(PickerOutcome::Canceled);
                }

                if let Some(result) = static_string(env, &main_cls, result_getter)? {
                    return Ok(PickerOutcome::Selected(result));
                }

                if let Some(err) = static_string(env, &main_cls, "getLastError")? {
                    log::error!("{} failed: {}", what, err);
                    return Err(classify_activity_error(err));
                }

                if static_flag(env, &main_cls, "wasDismissed") {
                    log::debug!("{} dismissed by user", what);
                    return Ok(PickerOutcome::Dismissed);
                }

                if Instant::now() >= deadline {
                    return Err(MediaError::Timeout(format!("{} - no selection made", what)));
                }

                std::thread::sleep(interval);
            }
        })
    }

    fn has_camera(&self) -> Result<bool, MediaError> {
        self.with_env(|env| {
            let (activity, _cls) = get_activity_instance(env, &self.config)?;
            let pm = env
                .call_method(
                    &activity,
                    "getPackageManager",
                    "()Landroid/content/pm/PackageManager;",
                    &[],
                )
                .and_then(|v| v.l())
                .map_err(jni_err("getPackageManager failed"))?;
            let feature = env
                .new_string("android.hardware.camera.any")
                .map_err(jni_err("new_string failed"))?;
            env.call_method(
                &pm,
                "hasSystemFeature",
                "(Ljava/lang/String;)Z",
                &[JValue::Object(&JObject::from(feature))],
            )
            .and_then(|v| v.z())
            .map_err(jni_err("hasSystemFeature failed"))
        })
    }
}

impl PickerBackend for AndroidBackend {
    fn name(&self) -> &'static str {
        "android"
    }

    fn capabilities(&self) -> Capabilities {
        let camera = match self.has_camera() {
            Ok(camera) => camera,
            Err(e) => {
                log::error!("Camera feature query failed: {}", e);
                false
            }
        };
        Capabilities {
            camera_available: camera,
            take_photo: camera,
            pick_photo: true,
            take_video: camera,
            pick_video: true,
        }
    }

    fn capture_photo(
        &self,
        request: &CaptureRequest,
        cancel: &CancellationToken,
    ) -> Result<PickerOutcome<PathBuf>, MediaError> {
        let outcome = self.launch_and_wait("Camera", "getLastPhotoPath", cancel, |env, activity| {
            let target = path_arg(env, &request.target)?;
            env.call_method(
                activity,
                "launchCamera",
                "(Ljava/lang/String;Z)V",
                &[JValue::Object(&target), JValue::Bool(front_flag(request.camera))],
            )
            .map_err(jni_err("launchCamera failed"))?;
            Ok(())
        })?;
        Ok(outcome.map(PathBuf::from))
    }

    fn pick_photo(&self, cancel: &CancellationToken) -> Result<PickerOutcome<PathBuf>, MediaError> {
        let outcome =
            self.launch_and_wait("Image picker", "getLastPhotoPath", cancel, |env, activity| {
                env.call_method(activity, "launchImagePicker", "()V", &[])
                    .map_err(jni_err("launchImagePicker failed"))?;
                Ok(())
            })?;
        Ok(outcome.map(PathBuf::from))
    }

    fn pick_photos(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PickerOutcome<Vec<PathBuf>>, MediaError> {
        let outcome = self.launch_and_wait(
            "Image picker (multi)",
            "getLastPhotoPaths",
            cancel,
            |env, activity| {
                env.call_method(activity, "launchImagePickerMulti", "()V", &[])
                    .map_err(jni_err("launchImagePickerMulti failed"))?;
                Ok(())
            },
        )?;

        Ok(match outcome {
            PickerOutcome::Selected(combined) => {
                let paths: Vec<PathBuf> = combined
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(PathBuf::from)
                    .collect();
                if paths.is_empty() {
                    PickerOutcome::Dismissed
                } else {
                    PickerOutcome::Selected(paths)
                }
            }
            other => other.map(|_| Vec::new()),
        })
    }

    fn capture_video(
        &self,
        request: &VideoRequest,
        cancel: &CancellationToken,
    ) -> Result<PickerOutcome<PathBuf>, MediaError> {
        // MediaStore.EXTRA_VIDEO_QUALITY only knows low (0) and high (1)
        let quality = match request.quality {
            VideoQuality::Low => 0,
            VideoQuality::Medium | VideoQuality::High => 1,
        };
        let max_seconds = request
            .max_duration
            .map(|d| d.as_secs().min(i32::MAX as u64) as i32)
            .unwrap_or(0);
        let max_bytes = request
            .max_size_bytes
            .map(|b| b.min(i64::MAX as u64) as i64)
            .unwrap_or(0);

        let outcome =
            self.launch_and_wait("Video camera", "getLastVideoPath", cancel, |env, activity| {
                let target = path_arg(env, &request.target)?;
                env.call_method(
                    activity,
                    "launchVideoCamera",
                    "(Ljava/lang/String;ZIIJ)V",
                    &[
                        JValue::Object(&target),
                        JValue::Bool(front_flag(request.camera)),
                        JValue::Int(quality),
                        JValue::Int(max_seconds),
                        JValue::Long(max_bytes),
                    ],
                )
                .map_err(jni_err("launchVideoCamera failed"))?;
                Ok(())
            })?;
        Ok(outcome.map(PathBuf::from))
    }

    fn pick_video(&self, cancel: &CancellationToken) -> Result<PickerOutcome<PathBuf>, MediaError> {
        let outcome =
            self.launch_and_wait("Video picker", "getLastVideoPath", cancel, |env, activity| {
                env.call_method(activity, "launchVideoPicker", "()V", &[])
                    .map_err(jni_err("launchVideoPicker failed"))?;
                Ok(())
            })?;
        Ok(outcome.map(PathBuf::from))
    }

    fn save_to_album(&self, path: &Path, kind: MediaKind) -> Result<PathBuf, MediaError> {
        self.with_env(|env| {
            let (activity, _cls) = get_activity_instance(env, &self.config)?;
            let jpath = path_arg(env, path)?;
            let saved = env
                .call_method(
                    &activity,
                    "saveToAlbum",
                    "(Ljava/lang/String;Z)Ljava/lang/String;",
                    &[
                        JValue::Object(&jpath),
                        JValue::Bool(u8::from(kind == MediaKind::Video)),
                    ],
                )
                .and_then(|v| v.l())
                .map_err(jni_err("saveToAlbum failed"))?;
            if saved.is_null() {
                return Err(MediaError::Platform("saveToAlbum returned null".to_string()));
            }
            let saved: String = env
                .get_string(&JString::from(saved))
                .map_err(jni_err("String conversion failed"))?
                .into();
            Ok(PathBuf::from(saved))
        })
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        self.with_env(|env| {
            let make = static_field_string(env, "android/os/Build", "MANUFACTURER");
            let model = static_field_string(env, "android/os/Build", "MODEL");
            let release = static_field_string(env, "android/os/Build$VERSION", "RELEASE");
            clear_exception(env);
            Ok(match (make, model) {
                (Some(make), Some(model)) => Some(DeviceInfo {
                    make,
                    model,
                    software: release.map(|r| format!("Android {}", r)),
                }),
                _ => None,
            })
        })
        .unwrap_or_else(|e| {
            log::warn!("Device info unavailable: {}", e);
            None
        })
    }
}
